//! In-memory caches for remote filesystem facts
//!
//! | Cache | Key | Lifetime |
//! |-------|-----|----------|
//! | Existence | absolute path | TTL + size bound, push-invalidated |
//! | Truename | absolute path | TTL + size bound, push-invalidated |
//! | Prefetch results | correlation key | one render operation |
//!
//! Nothing here is persisted across process restarts.

pub mod bounded;
pub mod store;

pub use bounded::{BoundedCache, CacheEntry, CacheStats};
pub use store::{CacheStore, StoreStats};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a cache mutex, recovering the data if a holder panicked.
///
/// Cache state is always valid between operations, so a poisoned lock is
/// safe to keep using.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
