//! Bookmarked games, persisted as a JSON array.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{load_or_default, save_pretty};
use crate::Error;
use crate::catalog::{BOOKMARK_ACCENT, BOOKMARKS_EMPTY, Catalog, RomEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub system: String,
    pub rom: String,
}

/// Bookmark list in `bookmark.json`.
///
/// Read-modify-write cycles are serialized by an internal mutex so two
/// concurrent additions cannot drop each other.
#[derive(Debug)]
pub struct BookmarkStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl BookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub async fn list(&self) -> Result<Vec<Bookmark>, Error> {
        load_or_default(&self.path).await
    }

    /// Append `bookmark` unless an identical one exists. Returns whether the
    /// list changed.
    pub async fn add(&self, bookmark: Bookmark) -> Result<bool, Error> {
        let _write = self.write_lock.lock().await;
        let mut bookmarks = self.list().await?;
        if bookmarks.contains(&bookmark) {
            return Ok(false);
        }
        bookmarks.push(bookmark);
        save_pretty(&self.path, &bookmarks).await?;
        Ok(true)
    }

    /// Remove every entry equal to `bookmark`. Returns whether any was removed.
    pub async fn remove(&self, bookmark: &Bookmark) -> Result<bool, Error> {
        let _write = self.write_lock.lock().await;
        let mut bookmarks = self.list().await?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b != bookmark);
        // Always rewrite, which also creates the file on first use.
        save_pretty(&self.path, &bookmarks).await?;
        Ok(bookmarks.len() != before)
    }

    /// Render the bookmarks as library cards grouped by system.
    ///
    /// Sizes are read from `roms_dir/<system>/<rom>`; a missing file shows as
    /// size 0.
    pub async fn render_html(&self, roms_dir: &Path) -> Result<String, Error> {
        let mut groups: BTreeMap<String, Vec<RomEntry>> = BTreeMap::new();
        for bookmark in self.list().await? {
            let size = tokio::fs::metadata(roms_dir.join(&bookmark.system).join(&bookmark.rom))
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            groups
                .entry(bookmark.system)
                .or_default()
                .push(RomEntry { name: bookmark.rom, size });
        }

        Ok(Catalog::from_groups(groups).render(BOOKMARK_ACCENT, BOOKMARKS_EMPTY))
    }
}
