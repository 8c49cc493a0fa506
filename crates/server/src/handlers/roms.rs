//! ROM deletion and patch injection.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use retroshelf_core::InjectOutcome;

use super::required_name;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RomQuery {
    pub sys: Option<String>,
    pub rom: Option<String>,
}

/// `DELETE /api/rom?sys=&rom=`
pub async fn delete_rom(State(state): State<AppState>, Query(query): Query<RomQuery>) -> ApiResult<StatusCode> {
    let system = required_name("sys", query.sys.as_deref())?;
    let rom = required_name("rom", query.rom.as_deref())?;

    let path = state.config.roms_dir().join(&system).join(&rom);
    tokio::fs::remove_file(&path).await.map_err(retroshelf_core::Error::from)?;

    tracing::info!(system, rom, "ROM deleted");
    Ok(StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
pub struct InjectQuery {
    pub sys: Option<String>,
    pub rom: Option<String>,
    /// Comma-separated patch references relative to the web root.
    pub inject: Option<String>,
}

/// `GET /api/rom/inject?sys=&rom=&inject=a,b`
///
/// The pipeline runs on its own task, so a client that disconnects does not
/// abort a half-finished rebuild.
pub async fn inject_rom(
    State(state): State<AppState>, Query(query): Query<InjectQuery>,
) -> ApiResult<(StatusCode, &'static str)> {
    let injector = Arc::clone(&state.injector);
    let InjectQuery { sys, rom, inject } = query;

    let outcome = tokio::spawn(async move {
        injector
            .inject(
                sys.as_deref().unwrap_or_default(),
                rom.as_deref().unwrap_or_default(),
                inject.as_deref().unwrap_or_default(),
            )
            .await
    })
    .await??;

    let message = match outcome {
        InjectOutcome::Applied => "Injection complete",
        InjectOutcome::AlreadyApplied => "Already injected",
    };
    Ok((StatusCode::OK, message))
}
