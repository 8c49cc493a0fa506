//! What a sync downloads.

use url::Url;

use retroshelf_core::Error;

/// Plain files of the emulator distribution, relative to the CDN base.
const EMULATORJS_ASSETS: &[&str] = &[
    "build.js",
    "index.html",
    "package-lock.json",
    "package.json",
    "update.js",
    "data/emulator.css",
    "data/emulator.min.css",
    "data/emulator.min.zip",
    "data/loader.js",
    "data/version.json",
    "data/compression/extract7z.js",
    "data/compression/extractzip.js",
    "data/compression/libunrar.js",
    "data/compression/libunrar.wasm",
    "data/localization/ar.json",
    "data/localization/bn.json",
    "data/localization/de.json",
    "data/localization/el.json",
    "data/localization/en.json",
    "data/localization/es.json",
    "data/localization/fa.json",
    "data/localization/fr.json",
    "data/localization/hi.json",
    "data/localization/it.json",
    "data/localization/ja.json",
    "data/localization/jv.json",
    "data/localization/ko.json",
    "data/localization/pt.json",
    "data/localization/retroarch.json",
    "data/localization/ro.json",
    "data/localization/ru.json",
    "data/localization/tr.json",
    "data/localization/vi.json",
    "data/localization/zh.json",
    "data/src/compression.js",
    "data/src/emulator.js",
    "data/src/GameManager.js",
    "data/src/gamepad.js",
    "data/src/nipplejs.js",
    "data/src/shaders.js",
    "data/src/socket.io.min.js",
    "data/src/storage.js",
    "minify/minify.js",
];

/// Core blobs (7z on the CDN, repacked as zip locally).
const EMULATORJS_CORES: &[&str] = &[
    "fbneo-wasm.data",
    "fbneo-thread-wasm.data",
    "fbneo-legacy-wasm.data",
    "mame2003_plus-wasm.data",
    "mame2003_plus-thread-wasm.data",
    "mame2003_plus-legacy-wasm.data",
    "mgba-wasm.data",
    "mgba-thread-wasm.data",
    "mgba-legacy-wasm.data",
    "melonds-wasm.data",
    "melonds-thread-wasm.data",
    "melonds-legacy-wasm.data",
    "mednafen_psx_hw-wasm.data",
    "mednafen_psx_hw-thread-wasm.data",
    "mednafen_psx_hw-legacy-wasm.data",
];

/// Directory of core blobs, relative to both the CDN base and the local
/// emulator directory.
pub const CORES_DIR: &str = "data/cores/";

#[derive(Debug, Clone)]
pub struct SyncManifest {
    base_url: Url,
    pub assets: Vec<String>,
    pub cores: Vec<String>,
}

impl SyncManifest {
    pub fn new(base_url: &str, assets: Vec<String>, cores: Vec<String>) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|e| Error::InvalidInput(format!("invalid base URL: {e}")))?;
        Ok(Self { base_url, assets, cores })
    }

    /// The full EmulatorJS distribution served from `base_url`.
    pub fn emulatorjs(base_url: &str) -> Result<Self, Error> {
        Self::new(
            base_url,
            EMULATORJS_ASSETS.iter().map(|&s| s.to_string()).collect(),
            EMULATORJS_CORES.iter().map(|&s| s.to_string()).collect(),
        )
    }

    pub fn total(&self) -> usize {
        self.assets.len() + self.cores.len()
    }

    pub fn asset_url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidInput(format!("invalid asset path {path}: {e}")))
    }

    pub fn core_url(&self, name: &str) -> Result<Url, Error> {
        self.asset_url(&format!("{CORES_DIR}{name}"))
    }
}
