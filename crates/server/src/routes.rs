//! Route configuration.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const LONG_CACHE: &str = "public, max-age=31536000";

/// Create the application router.
///
/// `/` and `/index.html` are rendered from the template; every other path
/// outside `/api` is served from the web root.
pub fn create_router(state: AppState) -> Router {
    let site_routes = Router::new()
        .route("/", get(handlers::get_index))
        .route("/index.html", get(handlers::get_index))
        .fallback_service(ServeDir::new(&state.config.web_root))
        .layer(middleware::from_fn(static_headers));

    let api_routes = Router::new()
        .route(
            "/api/bookmark",
            get(handlers::list_bookmarks)
                .post(handlers::add_bookmark)
                .delete(handlers::remove_bookmark),
        )
        .route("/api/rom", delete(handlers::delete_rom))
        .route("/api/rom/inject", get(handlers::inject_rom))
        .route("/api/save", post(handlers::upload_save))
        .route("/api/load", get(handlers::download_save))
        .route("/api/disk", get(handlers::disk_usage))
        .route("/api/download-cores", post(handlers::download_cores));

    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(site_routes)
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Cross-origin isolation (required for the emulator's shared memory) and
/// cache policy by path.
async fn static_headers(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("cross-origin-opener-policy", HeaderValue::from_static("same-origin"));
    headers.insert("cross-origin-embedder-policy", HeaderValue::from_static("require-corp"));

    if path.ends_with(".wasm") {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/wasm"));
    }

    if is_long_lived(&path) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(LONG_CACHE));
    } else if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }

    response
}

/// Emulator files and game archives never change under the same path.
fn is_long_lived(path: &str) -> bool {
    path.contains("/emulatorjs/") || path.contains("/data/cores/") || path.ends_with(".zip") || path.ends_with(".7z")
}
