//! Per-key mutual exclusion for long-running operations.
//!
//! A key is present in the table only while its operation runs. A second
//! request for a held key is refused instead of queued; callers report it as
//! busy and the client retries later.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lock key of the global emulator asset sync.
pub const BULK_SYNC_KEY: &str = "core_download";

/// Lock key of one ROM's injection pipeline.
pub fn inject_key(system: &str, rom: &str) -> String {
    format!("inject:{system}:{rom}")
}

/// Table of operation keys currently in progress.
///
/// One mutex guards the whole table. It is held only to insert or remove a
/// key and never across I/O.
#[derive(Debug, Default)]
pub struct LockRegistry {
    held: Mutex<HashSet<String>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as held. Returns false if it already was.
    pub fn try_acquire(&self, key: &str) -> bool {
        let acquired = self.table().insert(key.to_string());
        if !acquired {
            tracing::debug!(key, "lock busy");
        }
        acquired
    }

    /// Remove `key`. Safe to call for keys that were never acquired.
    pub fn release(&self, key: &str) {
        self.table().remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.table().contains(key)
    }

    /// Acquire `key` for the lifetime of the returned guard.
    ///
    /// The guard releases the key when dropped, which covers early returns,
    /// panics and cancelled futures alike.
    pub fn guard(self: &Arc<Self>, key: impl Into<String>) -> Option<LockGuard> {
        let key = key.into();
        if self.try_acquire(&key) { Some(LockGuard { registry: Arc::clone(self), key }) } else { None }
    }

    fn table(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set is consistent after every single insert/remove, so a
        // poisoned lock still holds valid data.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped ownership of one registry key.
#[derive(Debug)]
pub struct LockGuard {
    registry: Arc<LockRegistry>,
    key: String,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
