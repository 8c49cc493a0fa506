//! Unpacking of downloaded core blobs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use retroshelf_core::Error;

/// Extracts an archive in a foreign format into a directory.
#[async_trait::async_trait]
pub trait Unpacker: Send + Sync {
    /// Unpack `archive` into `dest`, creating `dest` if needed.
    async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), Error>;
}

/// 7-Zip command line tool (`7z x <archive> -o<dest> -y`).
#[derive(Debug, Clone)]
pub struct SevenZipCli {
    program: PathBuf,
}

impl Default for SevenZipCli {
    fn default() -> Self {
        Self::new("7z")
    }
}

impl SevenZipCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

#[async_trait::async_trait]
impl Unpacker for SevenZipCli {
    async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), Error> {
        tokio::fs::create_dir_all(dest).await?;

        let mut out_flag = OsString::from("-o");
        out_flag.push(dest);

        let output = Command::new(&self.program)
            .arg("x")
            .arg(archive)
            .arg(out_flag)
            .arg("-y")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Archive(format!("failed to run {}: {e}", self.program.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Archive(format!(
                "{} exited with {} for {}: {}",
                self.program.display(),
                output.status,
                archive.display(),
                stderr.trim()
            )));
        }
        Ok(())
    }
}
