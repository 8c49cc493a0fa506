//! Disk usage of the web root's filesystem.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use retroshelf_core::Error;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiskUsage {
    pub free: u64,
    pub total: u64,
}

/// `GET /api/disk`
pub async fn disk_usage(State(state): State<AppState>) -> ApiResult<Json<DiskUsage>> {
    let root = state.config.web_root.clone();
    let usage = tokio::task::spawn_blocking(move || -> Result<DiskUsage, Error> {
        Ok(DiskUsage { free: fs2::available_space(&root)?, total: fs2::total_space(&root)? })
    })
    .await??;
    Ok(Json(usage))
}
