//! Core types and shared functionality for retroshelf.
//!
//! This crate provides:
//! - Render cache for the library page, with ETag support
//! - Per-key operation locks
//! - Zip archive editing and the ROM patch injection pipeline
//! - JSON side-file stores (bookmarks, injection records, sync state)
//! - Unified error types
//! - Configuration structures

pub mod archive;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inject;
pub mod lock;
pub mod paths;
pub mod store;

pub use cache::{RenderCache, RenderedPage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use inject::{InjectOutcome, InjectionPipeline, PatchSet};
pub use lock::{LockGuard, LockRegistry};
pub use store::{Bookmark, BookmarkStore, InjectionRecords, SyncState, SyncStateStore};
