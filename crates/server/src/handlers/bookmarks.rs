//! Bookmark list endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;

use retroshelf_core::Bookmark;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkQuery {
    /// `html` selects the rendered card fragment instead of JSON.
    pub format: Option<String>,
}

/// `GET /api/bookmark[?format=html]`
pub async fn list_bookmarks(State(state): State<AppState>, Query(query): Query<BookmarkQuery>) -> ApiResult<Response> {
    if query.format.as_deref() == Some("html") {
        let html = state.bookmarks.render_html(&state.config.roms_dir()).await?;
        return Ok(([(CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response());
    }
    Ok(Json(state.bookmarks.list().await?).into_response())
}

/// `POST /api/bookmark` with `{"system": .., "rom": ..}`.
pub async fn add_bookmark(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let bookmark = parse_bookmark(&body)?;
    if state.bookmarks.add(bookmark).await? {
        tracing::debug!("bookmark added");
    }
    Ok(StatusCode::OK)
}

/// `DELETE /api/bookmark` with `{"system": .., "rom": ..}`.
pub async fn remove_bookmark(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let bookmark = parse_bookmark(&body)?;
    state.bookmarks.remove(&bookmark).await?;
    Ok(StatusCode::OK)
}

fn parse_bookmark(body: &[u8]) -> Result<Bookmark, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}
