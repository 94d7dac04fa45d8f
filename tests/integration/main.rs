//! Integration tests for remcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn remcache() -> Command {
        let mut cmd = cargo_bin_cmd!("remcache");
        cmd.env_remove("REMCACHE_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        remcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache coherence"));
    }

    #[test]
    fn version_displays() {
        remcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("remcache"));
    }

    #[test]
    fn normalize_strips_neutral_flags() {
        remcache()
            .args([
                "normalize",
                "--",
                "git",
                "--no-pager",
                "-c",
                "color.ui=false",
                "status",
                "-z",
                "--porcelain",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("status -z --porcelain"));
    }

    #[test]
    fn normalize_json_reports_directory() {
        remcache()
            .args([
                "normalize",
                "--cwd",
                "/repo",
                "--format",
                "json",
                "--",
                "git",
                "-C",
                "sub",
                "rev-parse",
                "HEAD",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"directory\": \"/repo/sub\""))
            .stdout(predicate::str::contains("\"key\": \"rev-parse HEAD\""));
    }

    #[test]
    fn normalize_miss_fails() {
        remcache()
            .args(["normalize", "--", "git", "--git-dir=/x/.git", "status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not normalizable"));
    }

    #[test]
    fn normalize_other_program_fails() {
        remcache()
            .args(["normalize", "--", "hg", "status"])
            .assert()
            .failure();
    }

    #[test]
    fn plan_json_lists_probes() {
        remcache()
            .args(["plan", "/repo", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"key\": \"rev-parse --show-toplevel\""))
            .stdout(predicate::str::contains("state:/repo/.git/refs/stash"));
    }

    #[test]
    fn plan_table_lists_state_files() {
        remcache()
            .args(["plan", "/repo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/repo/.git/MERGE_HEAD"));
    }

    #[test]
    fn plan_rejects_relative_directory() {
        remcache()
            .args(["plan", "repo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("absolute"));
    }

    #[test]
    fn config_path() {
        remcache()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        remcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("ttl_seconds = 300"));
    }

    #[test]
    fn config_init_then_set() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        remcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        remcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "set", "cache.maxEntries", "5"])
            .assert()
            .failure();

        remcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "set", "cache.max_entries", "5"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("max_entries = 5"));
    }

    #[test]
    fn config_accepts_camel_case_aliases() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttlSeconds = 7\n[watch]\ndebugLogging = true\n").unwrap();

        remcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ttl_seconds = 7"))
            .stdout(predicate::str::contains("debug_logging = true"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();
        remcache()
            .arg("--config")
            .arg(temp.path().join("absent.toml"))
            .args(["plan", "/repo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("config init"));
    }
}

mod engine_tests {
    use async_trait::async_trait;
    use remcache::config::Config;
    use remcache::normalize::MarkerAnswer;
    use remcache::rpc::{methods, Notification, RpcClient};
    use remcache::{CacheEngine, RemcacheError, RemcacheResult, RenderHooks};
    use serde_json::{json, Map, Value};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// Minimal server: every probe succeeds except those listed as failing
    #[derive(Default)]
    struct ScriptedServer {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedServer {
        fn count(&self, method: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
        }
    }

    #[async_trait]
    impl RpcClient for ScriptedServer {
        async fn call(&self, method: &str, params: Value) -> RemcacheResult<Value> {
            self.calls.lock().unwrap().push(method.to_string());

            match method {
                methods::RUN_PARALLEL => {
                    let mut results = Map::new();
                    for entry in params.as_array().into_iter().flatten() {
                        let key = entry["key"].as_str().unwrap_or_default();
                        let (code, stdout) = if self.failing.iter().any(|f| *f == key) {
                            (1, String::new())
                        } else if key == "rev-parse --show-toplevel" {
                            (0, "/srv/repo\n".to_string())
                        } else {
                            (0, format!("{key}\n"))
                        };
                        results.insert(
                            key.to_string(),
                            json!({"exit_code": code, "stdout": stdout, "stderr": ""}),
                        );
                    }
                    Ok(Value::Object(results))
                }
                methods::ANCESTORS_SCAN => Ok(json!({".git": "/srv/repo", ".hg": null})),
                methods::WATCH_ADD | methods::WATCH_REMOVE => Ok(json!(true)),
                methods::WATCH_LIST => Ok(json!([])),
                _ => Err(RemcacheError::rpc(method, "unknown method")),
            }
        }
    }

    fn engine(server: &Arc<ScriptedServer>) -> CacheEngine {
        CacheEngine::new(Config::default(), server.clone())
    }

    #[tokio::test]
    async fn render_cycle_end_to_end() {
        let server = Arc::new(ScriptedServer {
            failing: vec!["rev-parse --verify refs/stash", "state:/srv/repo/.git/MERGE_HEAD"],
            ..Default::default()
        });
        let engine = engine(&server);
        let repo = Path::new("/srv/repo");

        engine.before_render(repo).await;

        let status = engine
            .cached_command("/usr/bin/git", &["-P", "status", "-z", "--porcelain"], repo)
            .unwrap();
        assert!(status.success());
        assert!(engine
            .cached_command("git", &["rev-parse", "--verify", "refs/stash"], repo)
            .is_some_and(|out| !out.success()));
        assert_eq!(
            engine.marker_directory(Path::new("/srv/repo/src/main.rs"), ".git"),
            MarkerAnswer::Present(PathBuf::from("/srv/repo"))
        );

        engine.after_render(repo).await;

        assert!(engine
            .cached_command("git", &["status", "-z", "--porcelain"], repo)
            .is_none());
        assert_eq!(
            engine.file_exists(Path::new("/srv/repo/.git/refs/stash")),
            Some(true)
        );
        assert_eq!(
            engine.file_exists(Path::new("/srv/repo/.git/MERGE_HEAD")),
            Some(false)
        );
        assert_eq!(server.count(methods::RUN_PARALLEL), 1);
        assert_eq!(server.count(methods::WATCH_ADD), 1);
    }

    #[tokio::test]
    async fn second_render_does_not_rewatch() {
        let server = Arc::new(ScriptedServer::default());
        let engine = engine(&server);

        for _ in 0..3 {
            engine
                .with_prefetch(Path::new("/srv/repo/src"), || async {})
                .await;
        }

        assert_eq!(server.count(methods::RUN_PARALLEL), 3);
        assert_eq!(server.count(methods::WATCH_ADD), 1);
        assert_eq!(engine.watched().len(), 1);
    }

    #[tokio::test]
    async fn push_invalidates_through_feed() {
        let server = Arc::new(ScriptedServer::default());
        let engine = engine(&server);
        engine.record_exists("/srv/repo/src/main.rs", true);
        engine.record_exists("/srv/repo/README.md", true);

        let (feed, pump) = engine.spawn_notification_pump();
        let sender = feed.clone();
        std::thread::spawn(move || {
            sender
                .send(Notification::new(
                    methods::FS_CHANGED,
                    json!({"paths": ["/srv/repo/src/main.rs"]}),
                ))
                .unwrap();
        })
        .join()
        .unwrap();
        drop(feed);

        assert_eq!(pump.finished().await, 1);
        assert_eq!(engine.file_exists(Path::new("/srv/repo/src/main.rs")), None);
        assert_eq!(engine.file_exists(Path::new("/srv/repo/README.md")), Some(true));
    }

    #[tokio::test]
    async fn resync_and_close() {
        let server = Arc::new(ScriptedServer::default());
        let engine = engine(&server);
        engine.watch(Path::new("/srv/repo")).await.unwrap();

        // Server lost its watches, e.g. after a restart
        assert_eq!(engine.resync_watches().await.unwrap(), 0);
        assert!(engine.watched().is_empty());

        engine.connection_closed();
        assert!(matches!(
            engine.resync_watches().await,
            Err(RemcacheError::ConnectionClosed)
        ));
    }
}
