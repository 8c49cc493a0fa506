//! Server-side render cache for the library page.
//!
//! The page is the template with the ROM catalog spliced in. It is rebuilt
//! only when the [`SourceSignature`] of its inputs changes, and every build
//! carries a content-derived ETag for conditional GET.
//!
//! Validation is double-checked: a shared read lock serves the common case,
//! and a miss escalates to the write lock and validates again before
//! rebuilding, so requests racing past the first check trigger one rebuild.

pub mod hash;
pub mod signature;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_compression::tokio::write::GzipEncoder;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::catalog::{self, LIBRARY_ACCENT, LIBRARY_EMPTY};

pub use hash::{compute_etag, etag_matches};
pub use signature::SourceSignature;

/// Placeholder in the template that receives the rendered catalog.
pub const CONTENT_MARKER: &str = "<!-- SERVER_RENDERED_CONTENT -->";

/// One representation of the rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub body: Bytes,
    /// Unquoted ETag of the uncompressed body.
    pub etag: String,
    /// True when `body` is gzip-encoded.
    pub compressed: bool,
}

/// A fully rendered page and the input state it reflects.
#[derive(Debug)]
struct CacheEntry {
    raw_body: Bytes,
    compressed_body: Option<Bytes>,
    etag: String,
    signature: SourceSignature,
}

impl CacheEntry {
    fn is_valid_for(&self, current: &SourceSignature) -> bool {
        current.is_cacheable() && self.signature == *current
    }

    fn page(&self, wants_compressed: bool) -> RenderedPage {
        match (&self.compressed_body, wants_compressed) {
            (Some(gz), true) => RenderedPage { body: gz.clone(), etag: self.etag.clone(), compressed: true },
            _ => RenderedPage { body: self.raw_body.clone(), etag: self.etag.clone(), compressed: false },
        }
    }
}

/// Render cache over one template and one content directory.
#[derive(Debug)]
pub struct RenderCache {
    template_path: PathBuf,
    content_dir: PathBuf,
    gzip_enabled: bool,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    regenerations: AtomicU64,
}

impl RenderCache {
    pub fn new(template_path: impl Into<PathBuf>, content_dir: impl Into<PathBuf>, gzip_enabled: bool) -> Self {
        Self {
            template_path: template_path.into(),
            content_dir: content_dir.into(),
            gzip_enabled,
            entry: RwLock::new(None),
            regenerations: AtomicU64::new(0),
        }
    }

    /// Return the current page, rebuilding it if its inputs changed.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the template is missing and `Error::Io`
    /// if it or the content directory cannot be read.
    pub async fn get_or_render(&self, wants_compressed: bool) -> Result<RenderedPage, Error> {
        let current = SourceSignature::capture(&self.template_path, &self.content_dir).await?;

        {
            let cached = self.entry.read().await;
            if let Some(entry) = cached.as_ref().filter(|e| e.is_valid_for(&current)) {
                tracing::debug!(etag = %entry.etag, "render cache hit");
                return Ok(entry.page(wants_compressed));
            }
        }

        let mut cached = self.entry.write().await;
        if let Some(entry) = cached.as_ref().filter(|e| e.is_valid_for(&current)) {
            tracing::debug!(etag = %entry.etag, "render cache refreshed by a concurrent request");
            return Ok(entry.page(wants_compressed));
        }

        let entry = Arc::new(self.regenerate(current).await?);
        *cached = Some(Arc::clone(&entry));
        Ok(entry.page(wants_compressed))
    }

    /// Number of times the page has been rebuilt.
    pub fn regenerations(&self) -> u64 {
        self.regenerations.load(Ordering::Relaxed)
    }

    async fn regenerate(&self, signature: SourceSignature) -> Result<CacheEntry, Error> {
        let template = tokio::fs::read_to_string(&self.template_path).await?;
        let fragment = catalog::scan(&self.content_dir)
            .await?
            .render(LIBRARY_ACCENT, LIBRARY_EMPTY);
        let page = template.replacen(CONTENT_MARKER, &fragment, 1);

        let etag = compute_etag(page.as_bytes());
        let compressed_body = if self.gzip_enabled { Some(Bytes::from(gzip(page.as_bytes()).await?)) } else { None };

        self.regenerations.fetch_add(1, Ordering::Relaxed);
        tracing::info!(etag = %etag, bytes = page.len(), "rendered library page");

        Ok(CacheEntry { raw_body: Bytes::from(page), compressed_body, etag, signature })
    }
}

async fn gzip(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(data).await?;
    encoder.shutdown().await?;
    Ok(encoder.into_inner())
}
