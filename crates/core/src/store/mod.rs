//! Plain JSON side-files under the data directory.
//!
//! Each file is read whole and rewritten whole on change (uniquely named temp
//! file plus rename). Each store serializes its own read-modify-write cycles;
//! nothing coordinates across processes.

pub mod bookmarks;
pub mod injection;
pub mod sync_state;

use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Error;

pub use bookmarks::{Bookmark, BookmarkStore};
pub use injection::InjectionRecords;
pub use sync_state::{SyncState, SyncStateStore};

/// Read `path` as JSON, falling back to `T::default()` when the file is
/// missing or unreadable as JSON.
pub(crate) async fn load_or_default<T>(path: &Path) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed JSON side-file");
            Ok(T::default())
        }
    }
}

/// Replace `path` with the pretty-printed JSON of `value`.
pub(crate) async fn save_pretty<T>(path: &Path, value: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_replace(&path, &data)).await?
}

fn write_replace(path: &Path, data: &[u8]) -> Result<(), Error> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
