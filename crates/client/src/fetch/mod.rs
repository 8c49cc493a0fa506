//! HTTP download client.
//!
//! Bodies are streamed chunk by chunk into a `.part` file next to the
//! destination, which is renamed into place only once the whole body has
//! been written. A failed download never leaves a truncated destination.
//!
//! Non-2xx responses are failures. The only timeout is the per-request
//! timeout from [`DownloadConfig`]; there are no retries and no resume.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use url::Url;

use retroshelf_core::{AppConfig, Error};

/// Configuration for the download client.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// User agent string (default: "retroshelf/0.1")
    pub user_agent: String,

    /// Whole-request timeout (default: 300s)
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { user_agent: "retroshelf/0.1".to_string(), timeout: Duration::from_millis(300_000) }
    }
}

impl DownloadConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.download_timeout() }
    }
}

/// HTTP client that writes response bodies to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
}

impl Downloader {
    pub fn new(config: &DownloadConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Download(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Download `url` to `dest`, creating parent directories as needed.
    ///
    /// Returns the number of body bytes written.
    pub async fn download_to(&self, url: &Url, dest: &Path) -> Result<u64, Error> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Download(format!("{url}: network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!("{url}: status {}", status.as_u16())));
        }

        let part = part_path(dest);
        let written = match write_body(&mut response, &part).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part, dest).await?;

        tracing::debug!(url = %url, dest = %dest.display(), bytes = written, "downloaded");
        Ok(written)
    }
}

async fn write_body(response: &mut Response, path: &Path) -> Result<u64, Error> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::Download(format!("failed to read response: {e}")))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_files;
    use std::collections::HashMap;

    #[test]
    fn test_download_config_default() {
        let config = DownloadConfig::default();
        assert_eq!(config.user_agent, "retroshelf/0.1");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_download_config_from_app() {
        let app = AppConfig { user_agent: "shelf-test".into(), download_timeout_ms: 1500, ..AppConfig::default() };
        let config = DownloadConfig::from_app(&app);
        assert_eq!(config.user_agent, "shelf-test");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_part_path() {
        assert_eq!(part_path(Path::new("/a/b/loader.js")), PathBuf::from("/a/b/loader.js.part"));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let addr = serve_files(HashMap::from([("data/loader.js".to_string(), b"console.log(1)".to_vec())])).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("emulatorjs/data/loader.js");

        let downloader = Downloader::new(&DownloadConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/data/loader.js")).unwrap();
        let written = downloader.download_to(&url, &dest).await.unwrap();

        assert_eq!(written, 14);
        assert_eq!(std::fs::read(&dest).unwrap(), b"console.log(1)");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let addr = serve_files(HashMap::new()).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("missing.js");
        std::fs::write(&dest, b"previous").unwrap();

        let downloader = Downloader::new(&DownloadConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/missing.js")).unwrap();
        let result = downloader.download_to(&url, &dest).await;

        assert!(matches!(result, Err(Error::Download(msg)) if msg.contains("404")));
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(&DownloadConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/x")).unwrap();
        assert!(matches!(downloader.download_to(&url, &tmp.path().join("x")).await, Err(Error::Download(_))));
    }
}
