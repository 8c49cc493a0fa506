//! Record of the patch set last applied to each ROM.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

use super::{load_or_default, save_pretty};
use crate::Error;

/// Key/value store persisted as `injected.json`.
///
/// Keys are `"<system>/<rom>"`, values the canonical patch key (see
/// [`crate::inject::PatchSet`]). Injections on different ROMs record
/// concurrently, so updates are serialized.
#[derive(Debug)]
pub struct InjectionRecords {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl InjectionRecords {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn rom_key(system: &str, rom: &str) -> String {
        format!("{system}/{rom}")
    }

    pub async fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        load_or_default(&self.path).await
    }

    /// Canonical patch key last applied to the ROM, if any.
    pub async fn get(&self, system: &str, rom: &str) -> Result<Option<String>, Error> {
        Ok(self.load().await?.remove(&Self::rom_key(system, rom)))
    }

    /// Store `canonical` for the ROM, rewriting the whole file.
    pub async fn record(&self, system: &str, rom: &str, canonical: &str) -> Result<(), Error> {
        let _write = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.insert(Self::rom_key(system, rom), canonical.to_string());
        save_pretty(&self.path, &records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_get() {
        let tmp = tempfile::tempdir().unwrap();
        let records = InjectionRecords::new(tmp.path().join("injected.json"));

        assert_eq!(records.get("NES", "game.zip").await.unwrap(), None);

        records.record("NES", "game.zip", "/p/a.zip,/p/b.ips").await.unwrap();
        records.record("SNES", "other.zip", "/p/c.zip").await.unwrap();

        assert_eq!(records.get("NES", "game.zip").await.unwrap().as_deref(), Some("/p/a.zip,/p/b.ips"));
        assert_eq!(records.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let records = InjectionRecords::new(tmp.path().join("injected.json"));

        records.record("NES", "game.zip", "a").await.unwrap();
        records.record("NES", "game.zip", "a,b").await.unwrap();

        assert_eq!(records.get("NES", "game.zip").await.unwrap().as_deref(), Some("a,b"));
    }

    #[tokio::test]
    async fn test_file_format_is_flat_map() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("injected.json");
        let records = InjectionRecords::new(&path);
        records.record("GBA", "pokemon.zip", "x.ips").await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["GBA/pokemon.zip"], "x.ips");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_all_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let records = std::sync::Arc::new(InjectionRecords::new(tmp.path().join("injected.json")));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let records = std::sync::Arc::clone(&records);
                tokio::spawn(async move { records.record("NES", &format!("rom{i}.zip"), "a").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(records.load().await.unwrap().len(), 16);
    }
}
