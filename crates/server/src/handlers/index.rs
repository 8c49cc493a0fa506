//! Server-rendered library page.

use axum::extract::State;
use axum::http::header::{ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, ETAG, IF_NONE_MATCH, VARY};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use retroshelf_core::cache::etag_matches;

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /` and `GET /index.html`.
///
/// Answers `304 Not Modified` when `If-None-Match` matches the current ETag.
pub async fn get_index(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let page = state.render_cache.get_or_render(accepts_gzip(&headers)).await?;
    let etag = format!("\"{}\"", page.etag);

    if let Some(if_none_match) = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok())
        && etag_matches(if_none_match, &page.etag)
    {
        return Ok((StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response());
    }

    let mut response = (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (CACHE_CONTROL, "no-cache".to_string()),
            (ETAG, etag),
        ],
        page.body,
    )
        .into_response();

    if page.compressed {
        let headers = response.headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
    Ok(response)
}

fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("gzip"))
}
