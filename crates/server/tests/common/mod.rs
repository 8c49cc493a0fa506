//! Server test utilities.

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use retroshelf_core::AppConfig;
use retroshelf_server::{AppState, create_router};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEMPLATE: &str = "<!doctype html><html><body><!-- SERVER_RENDERED_CONTENT --></body></html>";

/// A router over a temporary web root.
///
/// Layout: `www/index.html`, `www/data/roms/NES/game.zip` (a real zip),
/// `www/patches/{hack.zip,game.srm}`. The CDN URL points at a closed local
/// port, so syncs run without network access and every download fails.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let www = temp_dir.path().join("www");
        std::fs::create_dir_all(&www).unwrap();
        std::fs::write(www.join("index.html"), TEMPLATE).unwrap();
        write_zip(&www.join("data/roms/NES/game.zip"), &[("game.nes", b"original rom")]);
        write_zip(&www.join("patches/hack.zip"), &[("game.nes", b"hacked rom")]);
        std::fs::write(www.join("patches/game.srm"), b"save").unwrap();

        let config = AppConfig {
            web_root: www.clone(),
            template_path: www.join("index.html"),
            data_dir: www.join("data"),
            emulator_dir: www.join("emulatorjs"),
            scratch_dir: temp_dir.path().join("scratch"),
            cdn_base_url: format!("http://{}/", closed_local_addr()),
            ..AppConfig::default()
        };

        let state = AppState::new(config).expect("Failed to build state");
        let router = create_router(state.clone());

        Self { router, state, temp_dir }
    }

    pub fn web_root(&self) -> PathBuf {
        self.temp_dir.path().join("www")
    }

    pub fn rom_path(&self) -> PathBuf {
        self.web_root().join("data/roms/NES/game.zip")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Send a request and return status and body text.
    pub async fn text(&self, method: &str, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
        let request = Request::builder().method(method).uri(uri).body(body.into()).unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, String::from_utf8(body_bytes(response).await).unwrap())
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn closed_local_addr() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
