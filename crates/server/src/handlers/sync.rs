//! Emulator asset sync trigger.

use std::sync::Arc;

use axum::extract::State;

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /api/download-cores`
///
/// Runs on its own task like injection; the response reports how many files
/// were updated and the recorded sync time.
pub async fn download_cores(State(state): State<AppState>) -> ApiResult<String> {
    let syncer = Arc::clone(&state.syncer);
    let report = tokio::spawn(async move { syncer.sync_assets().await }).await??;

    Ok(format!(
        "Sync complete: {} of {} files updated. [TIMESTAMP:{}]",
        report.succeeded, report.total, report.finished_at
    ))
}
