//! Outbound side of retroshelf.
//!
//! This crate provides the HTTP download client and the cooldown-gated sync
//! of emulator assets from the CDN, including the unpack/repack step for
//! core blobs.

pub mod fetch;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use fetch::{DownloadConfig, Downloader};
pub use sync::{SevenZipCli, SyncManifest, SyncOptions, SyncReport, SyncThrottler, Unpacker};
