//! Cooldown-gated bulk sync of emulator assets.
//!
//! One sync runs at a time (guarded by the `core_download` lock key) and at
//! most once per cooldown window. A sync downloads every plain asset of the
//! [`SyncManifest`] into the emulator directory, then downloads each core
//! blob, unpacks it with an [`Unpacker`] and repacks it as zip. Individual
//! failures are counted and the batch continues.
//!
//! The timestamp is persisted after every attempt that got past the cooldown
//! check, including attempts where every download failed.

pub mod manifest;
pub mod unpack;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use retroshelf_core::lock::{BULK_SYNC_KEY, LockRegistry};
use retroshelf_core::store::{SyncState, SyncStateStore};
use retroshelf_core::{AppConfig, Error, archive};

use crate::fetch::{DownloadConfig, Downloader};

pub use manifest::{CORES_DIR, SyncManifest};
pub use unpack::{SevenZipCli, Unpacker};

/// Outcome of one completed sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub succeeded: usize,
    pub total: usize,
    /// Unix seconds, as persisted in the sync state.
    pub finished_at: i64,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

/// Where and how often a sync runs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub manifest: SyncManifest,
    pub emulator_dir: PathBuf,
    /// Parent of the per-sync scratch directory.
    pub scratch_dir: PathBuf,
    pub state_path: PathBuf,
    pub cooldown: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            manifest: SyncManifest::emulatorjs(&config.cdn_base_url)?,
            emulator_dir: config.emulator_dir.clone(),
            scratch_dir: config.scratch_dir.clone(),
            state_path: config.sync_state_path(),
            cooldown: config.sync_cooldown(),
        })
    }
}

pub struct SyncThrottler {
    locks: Arc<LockRegistry>,
    downloader: Downloader,
    unpacker: Arc<dyn Unpacker>,
    state: SyncStateStore,
    options: SyncOptions,
}

impl SyncThrottler {
    pub fn new(
        locks: Arc<LockRegistry>, downloader: Downloader, unpacker: Arc<dyn Unpacker>, options: SyncOptions,
    ) -> Self {
        let state = SyncStateStore::new(&options.state_path);
        Self { locks, downloader, unpacker, state, options }
    }

    /// Production wiring: reqwest downloader and the `7z` command line tool.
    pub fn from_config(config: &AppConfig, locks: Arc<LockRegistry>) -> Result<Self, Error> {
        let downloader = Downloader::new(&DownloadConfig::from_app(config))?;
        Ok(Self::new(locks, downloader, Arc::new(SevenZipCli::default()), SyncOptions::from_config(config)?))
    }

    /// Run one sync.
    ///
    /// # Errors
    ///
    /// - `Busy` while another sync runs
    /// - `ThrottleActive` inside the cooldown window; nothing is downloaded
    /// - `Io` / `Store` if the sync state cannot be read or written
    ///
    /// Failed downloads are not errors; they show up in the report.
    pub async fn sync_assets(&self) -> Result<SyncReport, Error> {
        let Some(_guard) = self.locks.guard(BULK_SYNC_KEY) else {
            return Err(Error::Busy("asset sync is already running".to_string()));
        };

        let state = self.state.load().await?;
        if let Some(remaining) = state.cooldown_remaining(Utc::now().timestamp_millis(), self.options.cooldown) {
            tracing::debug!(remaining_secs = remaining.as_secs(), "sync throttled");
            return Err(Error::ThrottleActive { remaining });
        }

        let scratch = self.options.scratch_dir.join("cores");
        reset_dir(&scratch).await?;

        let manifest = &self.options.manifest;
        let mut succeeded = 0;
        for path in &manifest.assets {
            match self.sync_asset(path).await {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::warn!(asset = %path, error = %e, "asset download failed"),
            }
        }
        for name in &manifest.cores {
            match self.sync_core(name, &scratch).await {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::warn!(core = %name, error = %e, "core update failed"),
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::warn!(dir = %scratch.display(), error = %e, "failed to remove sync scratch directory");
        }

        let finished = SyncState::finished_now();
        self.state.save(&finished).await?;
        let finished_at = finished.last_sync_time;

        let report = SyncReport { succeeded, total: manifest.total(), finished_at };
        tracing::info!(succeeded, total = report.total, finished_at, "asset sync complete");
        Ok(report)
    }

    async fn sync_asset(&self, path: &str) -> Result<(), Error> {
        let url = self.options.manifest.asset_url(path)?;
        self.downloader
            .download_to(&url, &self.options.emulator_dir.join(path))
            .await?;
        Ok(())
    }

    /// Download, unpack and repack one core blob. The installed file is
    /// replaced only once the repacked archive is complete.
    async fn sync_core(&self, name: &str, scratch: &Path) -> Result<(), Error> {
        let url = self.options.manifest.core_url(name)?;
        let downloaded = scratch.join(name);
        self.downloader.download_to(&url, &downloaded).await?;

        let extracted = scratch.join(format!("{name}_ext"));
        self.unpacker.unpack(&downloaded, &extracted).await?;

        let packed = scratch.join(format!("{name}.zip"));
        let target = self.options.emulator_dir.join(CORES_DIR).join(name);
        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            archive::pack(&extracted, &packed)?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            archive::replace_file(&packed, &target)
        })
        .await??;
        Ok(())
    }
}

async fn reset_dir(dir: &Path) -> Result<(), Error> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
