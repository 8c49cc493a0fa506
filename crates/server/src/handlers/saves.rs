//! Save file upload and download.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;

use retroshelf_core::Error;

use super::required_name;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SaveQuery {
    pub name: Option<String>,
}

/// `POST /api/save?name=` with the raw save file as body.
pub async fn upload_save(
    State(state): State<AppState>, Query(query): Query<SaveQuery>, body: Bytes,
) -> ApiResult<StatusCode> {
    let name = required_name("name", query.name.as_deref())?;
    let dir = state.config.saves_dir();
    tokio::fs::create_dir_all(&dir).await.map_err(Error::from)?;
    tokio::fs::write(dir.join(&name), &body).await.map_err(Error::from)?;

    tracing::debug!(name, bytes = body.len(), "save stored");
    Ok(StatusCode::OK)
}

/// `GET /api/load?name=`
pub async fn download_save(State(state): State<AppState>, Query(query): Query<SaveQuery>) -> ApiResult<Response> {
    let name = required_name("name", query.name.as_deref())?;
    let data = match tokio::fs::read(state.config.saves_dir().join(&name)).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("save {name}")).into());
        }
        Err(e) => return Err(Error::from(e).into()),
    };

    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
    Ok((
        [(CONTENT_TYPE, "application/octet-stream".to_string()), (CONTENT_DISPOSITION, disposition)],
        data,
    )
        .into_response())
}
