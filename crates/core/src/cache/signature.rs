//! Filesystem state that a rendered page depends on.

use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use crate::Error;

/// Snapshot of the render inputs, compared field by field.
///
/// Only the content directory and its immediate subdirectories are observed.
/// Changes further down the tree do not invalidate the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSignature {
    /// Newest mtime among the content directory and its direct subdirectories.
    /// `None` when the content directory cannot be read.
    pub newest_dir_mtime: Option<SystemTime>,
    pub template_mtime: SystemTime,
    pub template_len: u64,
}

impl SourceSignature {
    /// Capture the current signature.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the template does not exist.
    pub async fn capture(template_path: &Path, content_dir: &Path) -> Result<Self, Error> {
        let newest_dir_mtime = newest_dir_mtime(content_dir).await;

        let template = match tokio::fs::metadata(template_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("template {}", template_path.display())));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { newest_dir_mtime, template_mtime: template.modified()?, template_len: template.len() })
    }

    /// A signature without a directory timestamp never validates a cached page.
    pub fn is_cacheable(&self) -> bool {
        self.newest_dir_mtime.is_some()
    }
}

/// Newest modification time of `dir` and its immediate subdirectories.
pub async fn newest_dir_mtime(dir: &Path) -> Option<SystemTime> {
    let mut newest = tokio::fs::metadata(dir).await.ok()?.modified().ok()?;

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Some(newest);
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(meta) = entry.metadata().await else { continue };
        if !meta.is_dir() {
            continue;
        }
        if let Ok(mtime) = meta.modified()
            && mtime > newest
        {
            newest = mtime;
        }
    }

    Some(newest)
}
