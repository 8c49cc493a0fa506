//! ROM patch injection.
//!
//! Applying a patch set extracts the ROM archive into a staging directory,
//! overlays each patch file or patch archive on top, repacks the result and
//! swaps it in for the existing archive. The applied set is recorded per ROM so that
//! repeating the same request is a no-op.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::AppConfig;
use crate::lock::{LockRegistry, inject_key};
use crate::paths::{resolve_under, safe_component};
use crate::store::InjectionRecords;
use crate::{Error, archive};

/// Result of a successful [`InjectionPipeline::inject`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The archive was rebuilt and the record updated.
    Applied,
    /// The same patch set was already recorded; nothing was touched.
    AlreadyApplied,
}

/// Sorted list of patch references parsed from a comma-separated request value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    entries: Vec<String>,
}

impl PatchSet {
    /// Split on `,`, trim, drop empty entries and sort.
    pub fn parse(list: &str) -> Result<Self, Error> {
        let mut entries: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if entries.is_empty() {
            return Err(Error::InvalidInput("patch list is empty".to_string()));
        }
        entries.sort();
        Ok(Self { entries })
    }

    /// Order-independent identity of the set, as stored in the injection record.
    pub fn canonical_key(&self) -> String {
        self.entries.join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[derive(Debug)]
pub struct InjectionPipeline {
    locks: Arc<LockRegistry>,
    records: InjectionRecords,
    roms_dir: PathBuf,
    web_root: PathBuf,
    scratch_dir: PathBuf,
}

impl InjectionPipeline {
    pub fn new(
        locks: Arc<LockRegistry>, records: InjectionRecords, roms_dir: impl Into<PathBuf>,
        web_root: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            locks,
            records,
            roms_dir: roms_dir.into(),
            web_root: web_root.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig, locks: Arc<LockRegistry>) -> Self {
        Self::new(
            locks,
            InjectionRecords::new(config.injection_log_path()),
            config.roms_dir(),
            &config.web_root,
            &config.scratch_dir,
        )
    }

    /// Apply `patch_list` to `<roms_dir>/<system>/<rom>`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for empty parameters or an empty patch list
    /// - `Busy` while another injection for the same ROM runs
    /// - `NotFound` if the ROM archive does not exist
    /// - `Io` / `Archive` if any step of the rebuild fails; the existing ROM
    ///   is then left as it was
    pub async fn inject(&self, system: &str, rom: &str, patch_list: &str) -> Result<InjectOutcome, Error> {
        let system = required_component("sys", system)?;
        let rom = required_component("rom", rom)?;
        let patches = PatchSet::parse(patch_list)?;
        let canonical = patches.canonical_key();

        let Some(_guard) = self.locks.guard(inject_key(system, rom)) else {
            return Err(Error::Busy(format!("injection for {system}/{rom} is already running")));
        };

        if self.records.get(system, rom).await?.as_deref() == Some(canonical.as_str()) {
            tracing::debug!(system, rom, patches = %canonical, "patch set already applied");
            return Ok(InjectOutcome::AlreadyApplied);
        }

        let rom_path = self.roms_dir.join(system).join(rom);
        if !tokio::fs::try_exists(&rom_path).await? {
            return Err(Error::NotFound(format!("ROM {system}/{rom}")));
        }

        let patch_paths: Vec<PathBuf> = patches
            .iter()
            .filter_map(|reference| {
                let resolved = resolve_under(&self.web_root, reference);
                if resolved.is_none() {
                    tracing::warn!(reference, "skipping patch outside the web root");
                }
                resolved
            })
            .collect();

        let scratch_dir = self.scratch_dir.clone();
        let prefix = format!("inject-{system}-");
        let merged = tokio::task::spawn_blocking(move || {
            Staging::new(&scratch_dir, &prefix)?.rebuild(&rom_path, &patch_paths)
        })
        .await??;

        self.records.record(system, rom, &canonical).await?;
        tracing::info!(system, rom, patches = %canonical, merged, "injection complete");
        Ok(InjectOutcome::Applied)
    }
}

fn required_component<'a>(field: &str, value: &'a str) -> Result<&'a str, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("missing parameter '{field}'")));
    }
    safe_component(value).ok_or_else(|| Error::InvalidInput(format!("invalid value for '{field}': {value}")))
}

/// Scratch resources of one injection, removed when dropped.
///
/// The directory name is unique per invocation, so injections on ROMs whose
/// names collide after flattening never share a staging area.
struct Staging {
    root: TempDir,
    dir: PathBuf,
    archive: PathBuf,
}

impl Staging {
    fn new(scratch_dir: &Path, prefix: &str) -> Result<Self, Error> {
        fs::create_dir_all(scratch_dir)?;
        let root = tempfile::Builder::new().prefix(prefix).tempdir_in(scratch_dir)?;
        let dir = root.path().join("rom");
        let archive = root.path().join("repacked.zip");
        Ok(Self { root, dir, archive })
    }

    /// Extract, overlay, repack and replace. Returns the number of patches
    /// merged.
    fn rebuild(self, rom_path: &Path, patches: &[PathBuf]) -> Result<usize, Error> {
        archive::extract(rom_path, &self.dir)?;

        let mut merged = 0;
        for patch in patches {
            if !patch.is_file() {
                tracing::debug!(patch = %patch.display(), "patch file not found, skipping");
                continue;
            }
            archive::overlay_merge(patch, &self.dir)?;
            merged += 1;
        }

        archive::pack(&self.dir, &self.archive)?;
        archive::replace_file(&self.archive, rom_path)?;

        let root = self.root.path().to_path_buf();
        if let Err(e) = self.root.close() {
            tracing::warn!(dir = %root.display(), error = %e, "failed to remove staging directory");
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    struct Fixture {
        tmp: tempfile::TempDir,
        locks: Arc<LockRegistry>,
        pipeline: InjectionPipeline,
    }

    impl Fixture {
        fn web_root(&self) -> PathBuf {
            self.tmp.path().join("www")
        }

        fn rom_path(&self) -> PathBuf {
            self.web_root().join("data/roms/NES/game.zip")
        }

        fn scratch(&self) -> PathBuf {
            self.tmp.path().join("scratch")
        }
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn read_entry(path: &Path, name: &str) -> Option<Vec<u8>> {
        let mut archive = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).ok()?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        Some(buf)
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let www = tmp.path().join("www");
        write_zip(&www.join("data/roms/NES/game.zip"), &[("game.nes", b"original rom")]);
        write_zip(&www.join("patches/hack.zip"), &[("game.nes", b"hacked rom"), ("cheats/all.cht", b"cheats")]);
        fs::write(www.join("patches/game.srm"), b"save data").unwrap();

        let locks = Arc::new(LockRegistry::new());
        let pipeline = InjectionPipeline::new(
            Arc::clone(&locks),
            InjectionRecords::new(www.join("data/injected.json")),
            www.join("data/roms"),
            &www,
            tmp.path().join("scratch"),
        );
        Fixture { tmp, locks, pipeline }
    }

    #[test]
    fn test_patch_set_canonical_key() {
        let a = PatchSet::parse("/p/b.zip, /p/a.ips,,").unwrap();
        let b = PatchSet::parse("/p/a.ips,/p/b.zip").unwrap();
        assert_eq!(a.canonical_key(), "/p/a.ips,/p/b.zip");
        assert_eq!(a, b);
        assert!(matches!(PatchSet::parse(" , "), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_inject_applies_patches() {
        let fx = fixture();
        let outcome = fx
            .pipeline
            .inject("NES", "game.zip", "/patches/hack.zip,/patches/game.srm")
            .await
            .unwrap();

        assert_eq!(outcome, InjectOutcome::Applied);
        let rom = fx.rom_path();
        assert_eq!(read_entry(&rom, "game.nes").unwrap(), b"hacked rom");
        assert_eq!(read_entry(&rom, "cheats/all.cht").unwrap(), b"cheats");
        assert_eq!(read_entry(&rom, "game.srm").unwrap(), b"save data");

        let record = fs::read_to_string(fx.web_root().join("data/injected.json")).unwrap();
        assert!(record.contains(r#""NES/game.zip": "/patches/game.srm,/patches/hack.zip""#));
    }

    #[tokio::test]
    async fn test_inject_is_idempotent_across_orderings() {
        let fx = fixture();
        fx.pipeline
            .inject("NES", "game.zip", "/patches/hack.zip,/patches/game.srm")
            .await
            .unwrap();
        let bytes = fs::read(fx.rom_path()).unwrap();

        let second = fx
            .pipeline
            .inject("NES", "game.zip", "/patches/game.srm,/patches/hack.zip")
            .await
            .unwrap();

        assert_eq!(second, InjectOutcome::AlreadyApplied);
        assert_eq!(fs::read(fx.rom_path()).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_different_set_is_reapplied() {
        let fx = fixture();
        fx.pipeline.inject("NES", "game.zip", "/patches/game.srm").await.unwrap();
        let outcome = fx.pipeline.inject("NES", "game.zip", "/patches/hack.zip").await.unwrap();

        assert_eq!(outcome, InjectOutcome::Applied);
        assert_eq!(read_entry(&fx.rom_path(), "game.nes").unwrap(), b"hacked rom");
        // Earlier merges stay in the archive.
        assert!(read_entry(&fx.rom_path(), "game.srm").is_some());
    }

    #[tokio::test]
    async fn test_missing_and_escaping_patches_are_skipped() {
        let fx = fixture();
        fs::write(fx.tmp.path().join("outside.srm"), b"secret").unwrap();

        let outcome = fx
            .pipeline
            .inject("NES", "game.zip", "/patches/absent.ips,../outside.srm")
            .await
            .unwrap();

        assert_eq!(outcome, InjectOutcome::Applied);
        assert_eq!(read_entry(&fx.rom_path(), "game.nes").unwrap(), b"original rom");
        assert!(read_entry(&fx.rom_path(), "outside.srm").is_none());
    }

    #[tokio::test]
    async fn test_missing_rom_is_not_found() {
        let fx = fixture();
        let result = fx.pipeline.inject("NES", "absent.zip", "/patches/game.srm").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!fx.locks.is_held(&inject_key("NES", "absent.zip")));
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let fx = fixture();
        assert!(matches!(fx.pipeline.inject("", "game.zip", "a").await, Err(Error::InvalidInput(_))));
        assert!(matches!(fx.pipeline.inject("NES", "", "a").await, Err(Error::InvalidInput(_))));
        assert!(matches!(fx.pipeline.inject("NES", "game.zip", "").await, Err(Error::InvalidInput(_))));
        assert!(matches!(fx.pipeline.inject("..", "game.zip", "a").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_traversal_in_rom_name_is_reduced() {
        let fx = fixture();
        let outcome = fx
            .pipeline
            .inject("NES", "../../NES/game.zip", "/patches/game.srm")
            .await
            .unwrap();
        assert_eq!(outcome, InjectOutcome::Applied);
        assert!(read_entry(&fx.rom_path(), "game.srm").is_some());
    }

    #[tokio::test]
    async fn test_held_key_is_busy() {
        let fx = fixture();
        let _held = fx.locks.guard(inject_key("NES", "game.zip")).unwrap();

        let result = fx.pipeline.inject("NES", "game.zip", "/patches/game.srm").await;
        assert!(matches!(result, Err(Error::Busy(_))));
    }

    #[tokio::test]
    async fn test_concurrent_injections_one_runs() {
        let fx = fixture();
        let (a, b) = tokio::join!(
            fx.pipeline.inject("NES", "game.zip", "/patches/hack.zip"),
            fx.pipeline.inject("NES", "game.zip", "/patches/hack.zip"),
        );

        let busy = [&a, &b].iter().filter(|r| matches!(r, Err(Error::Busy(_)))).count();
        let applied = [&a, &b].iter().filter(|r| matches!(r, Ok(InjectOutcome::Applied))).count();
        assert_eq!((busy, applied), (1, 1));
        assert!(!fx.locks.is_held(&inject_key("NES", "game.zip")));
    }

    #[tokio::test]
    async fn test_staging_is_cleaned_up() {
        let fx = fixture();
        fx.pipeline.inject("NES", "game.zip", "/patches/hack.zip").await.unwrap();

        let leftovers: Vec<_> = fs::read_dir(fx.scratch()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_failure_leaves_rom_and_releases_lock() {
        let fx = fixture();
        fs::write(fx.rom_path(), b"not a zip archive").unwrap();

        let result = fx.pipeline.inject("NES", "game.zip", "/patches/hack.zip").await;

        assert!(result.is_err());
        assert_eq!(fs::read(fx.rom_path()).unwrap(), b"not a zip archive");
        assert!(!fx.locks.is_held(&inject_key("NES", "game.zip")));
        assert_eq!(fs::read_dir(fx.scratch()).unwrap().count(), 0);
        assert!(!fx.web_root().join("data/injected.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_colliding_flattened_names_do_not_share_staging() {
        let fx = fixture();
        let roms = fx.web_root().join("data/roms");
        let first = roms.join("A-B/c.zip");
        let second = roms.join("A/B-c.zip");

        for _ in 0..10 {
            write_zip(&first, &[("first.bin", b"first")]);
            write_zip(&second, &[("second.bin", b"second")]);
            fs::remove_file(fx.web_root().join("data/injected.json")).ok();

            let (a, b) = tokio::join!(
                fx.pipeline.inject("A-B", "c.zip", "/patches/game.srm"),
                fx.pipeline.inject("A", "B-c.zip", "/patches/game.srm"),
            );
            assert_eq!(a.unwrap(), InjectOutcome::Applied);
            assert_eq!(b.unwrap(), InjectOutcome::Applied);

            assert_eq!(read_entry(&first, "first.bin").unwrap(), b"first");
            assert!(read_entry(&first, "second.bin").is_none());
            assert_eq!(read_entry(&second, "second.bin").unwrap(), b"second");
            assert!(read_entry(&second, "first.bin").is_none());
            assert!(read_entry(&first, "game.srm").is_some());
            assert!(read_entry(&second, "game.srm").is_some());
        }
        assert_eq!(fs::read_dir(fx.scratch()).unwrap().count(), 0);
    }
}
