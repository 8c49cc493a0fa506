//! Zip archive primitives: extract, pack, overlay merge and file replacement.
//!
//! All functions are blocking; async callers run them on the blocking pool.
//! Any I/O or format error aborts the whole operation. Partially written
//! output is left for the caller to discard.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::Error;

/// Permission bits of every extracted file, regardless of the stored mode.
#[cfg(unix)]
const EXTRACTED_FILE_MODE: u32 = 0o644;

/// Extract `archive_path` into `dest_dir`, overwriting existing files.
///
/// Entries whose path would land outside `dest_dir` (absolute names or `..`
/// components) are skipped. Returns the number of files written.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<usize, Error> {
    let reader = BufReader::new(File::open(archive_path)?);
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(dest_dir)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), archive = %archive_path.display(), "skipping entry outside destination");
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = create_extracted_file(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

#[cfg(unix)]
fn create_extracted_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(EXTRACTED_FILE_MODE)
        .open(path)?;
    // mode() only applies on creation; overwritten files keep theirs otherwise.
    file.set_permissions(fs::Permissions::from_mode(EXTRACTED_FILE_MODE))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_extracted_file(path: &Path) -> io::Result<File> {
    File::create(path)
}

/// Pack every regular file under `source_dir` into a new archive.
///
/// Entry names are `/`-separated paths relative to `source_dir`, written in
/// sorted order with Deflate compression. Directories get no entries of their
/// own. Returns the number of entries written.
pub fn pack(source_dir: &Path, archive_path: &Path) -> Result<usize, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry.map_err(|e| Error::Io(io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Archive(e.to_string()))?;
        files.push((entry_name(relative), entry.into_path()));
    }
    files.sort();

    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &files {
        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(path)?;
        io::copy(&mut input, &mut zip)?;
    }

    let mut out = zip.finish()?;
    io::Write::flush(&mut out)?;
    Ok(files.len())
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` names a zip archive (by extension, case-insensitive).
pub fn is_zip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Overlay `source` onto `dest_dir`.
///
/// A zip archive is extracted into `dest_dir`; any other file is copied to
/// `dest_dir/<file name>`. Existing files are overwritten either way.
pub fn overlay_merge(source: &Path, dest_dir: &Path) -> Result<(), Error> {
    if is_zip(source) {
        extract(source, dest_dir)?;
        return Ok(());
    }

    let name = source
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", source.display())))?;
    fs::create_dir_all(dest_dir)?;
    fs::copy(source, dest_dir.join(name))?;
    Ok(())
}

/// Move `src` over `dst`.
///
/// Tries an atomic rename first. When that fails (for example across
/// filesystems) it copies and then deletes `src`; that fallback is not
/// crash-atomic.
pub fn replace_file(src: &Path, dst: &Path) -> Result<(), Error> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(src = %src.display(), dst = %dst.display(), error = %e, "rename failed, copying instead");
            fs::copy(src, dst)?;
            fs::remove_file(src)?;
            Ok(())
        }
    }
}
