//! Scripted in-memory server for unit tests

use super::RpcClient;
use crate::cache::lock;
use crate::error::{RemcacheError, RemcacheResult};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&Value) -> Value + Send + Sync>;
type CallHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub(crate) struct FakeServer {
    responders: Mutex<HashMap<String, Responder>>,
    failures: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Mutex<Option<Duration>>,
    hook: Mutex<Option<CallHook>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answer `method` with `value`
    pub fn respond(&self, method: &str, value: Value) {
        self.respond_with(method, move |_| value.clone());
    }

    /// Answer `method` with a function of the request params
    pub fn respond_with(&self, method: &str, f: impl Fn(&Value) -> Value + Send + Sync + 'static) {
        lock(&self.responders).insert(method.to_string(), Box::new(f));
    }

    /// Make every call to `method` fail at the transport level
    pub fn fail(&self, method: &str) {
        lock(&self.failures).insert(method.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// Run `hook` at the start of every call, before the reply is produced
    pub fn on_call(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.hook) = Some(Box::new(hook));
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        lock(&self.calls)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls_to(method).len()
    }
}

#[async_trait]
impl RpcClient for FakeServer {
    async fn call(&self, method: &str, params: Value) -> RemcacheResult<Value> {
        lock(&self.calls).push((method.to_string(), params.clone()));

        if let Some(hook) = lock(&self.hook).as_ref() {
            hook(method);
        }

        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if lock(&self.failures).contains(method) {
            return Err(RemcacheError::rpc(method, "injected failure"));
        }

        Ok(lock(&self.responders)
            .get(method)
            .map(|respond| respond(&params))
            .unwrap_or(Value::Null))
    }
}

/// Build a `commands.run_parallel` responder.
///
/// Keys listed in `outcomes` get the given exit code and stdout; every other
/// requested key exits 1 with empty output.
pub(crate) fn batch_responder(
    outcomes: &[(&str, i32, &str)],
) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let outcomes: HashMap<String, (i32, String)> = outcomes
        .iter()
        .map(|(key, code, out)| (key.to_string(), (*code, out.to_string())))
        .collect();

    move |params| {
        let mut results = Map::new();
        for entry in params.as_array().into_iter().flatten() {
            let Some(key) = entry["key"].as_str() else {
                continue;
            };
            let (code, stdout) = outcomes
                .get(key)
                .cloned()
                .unwrap_or((1, String::new()));
            results.insert(
                key.to_string(),
                json!({"exit_code": code, "stdout": stdout, "stderr": ""}),
            );
        }
        Value::Object(results)
    }
}
