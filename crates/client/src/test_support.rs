use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{StatusCode, Uri};

/// Serve `files` (path without leading slash → body) on an ephemeral local
/// port. Unknown paths get 404.
pub async fn serve_files(files: HashMap<String, Vec<u8>>) -> SocketAddr {
    let files = Arc::new(files);
    let app = Router::new().fallback(move |uri: Uri| {
        let files = Arc::clone(&files);
        async move {
            match files.get(uri.path().trim_start_matches('/')) {
                Some(body) => (StatusCode::OK, body.clone()),
                None => (StatusCode::NOT_FOUND, b"not found".to_vec()),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
