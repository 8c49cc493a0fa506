//! Timestamp of the last bulk asset sync.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{load_or_default, save_pretty};
use crate::Error;

/// Contents of `core_sync.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Unix seconds of the last completed attempt; 0 when never synced.
    #[serde(rename = "lastSyncTime", default)]
    pub last_sync_time: i64,
}

impl SyncState {
    /// State recording an attempt that finished now.
    pub fn finished_now() -> Self {
        Self { last_sync_time: Utc::now().timestamp() }
    }

    /// Time left before another sync may start, or `None` if allowed now.
    ///
    /// `now_millis` is Unix milliseconds. The stored second is truncated, so
    /// an attempt that finished within the current second has already used
    /// part of it and the remainder stays below the full cooldown. A timestamp
    /// in the future (clock moved backwards) counts as a full cooldown.
    pub fn cooldown_remaining(&self, now_millis: i64, cooldown: Duration) -> Option<Duration> {
        if self.last_sync_time <= 0 {
            return None;
        }
        let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
        let elapsed = now_millis.saturating_sub(self.last_sync_time.saturating_mul(1000));
        if elapsed < 0 {
            return Some(cooldown);
        }
        if elapsed >= cooldown_ms {
            return None;
        }
        let remaining = cooldown_ms - elapsed.max(1);
        Some(Duration::from_millis(remaining.unsigned_abs()))
    }
}

#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<SyncState, Error> {
        load_or_default(&self.path).await
    }

    pub async fn save(&self, state: &SyncState) -> Result<(), Error> {
        save_pretty(&self.path, state).await
    }
}
