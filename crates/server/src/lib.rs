//! HTTP server for retroshelf.
//!
//! This crate provides:
//! - The server-rendered library page with conditional GET
//! - Bookmark, ROM, save and disk-usage endpoints
//! - Patch injection and emulator asset sync endpoints
//! - Static file serving of the web root

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
