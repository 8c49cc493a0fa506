//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RETROSHELF_*)
//! 2. TOML config file (if RETROSHELF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RETROSHELF_*)
/// 2. TOML config file (if RETROSHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    ///
    /// Set via RETROSHELF_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory served as static files. Patch paths are resolved against it.
    ///
    /// Set via RETROSHELF_WEB_ROOT environment variable.
    #[serde(default = "default_web_root")]
    pub web_root: PathBuf,

    /// Page template containing the server-rendered content marker.
    ///
    /// Set via RETROSHELF_TEMPLATE_PATH environment variable.
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,

    /// Root of ROMs, saves and the JSON side-files.
    ///
    /// Set via RETROSHELF_DATA_DIR environment variable.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Destination of the synchronized emulator distribution.
    ///
    /// Set via RETROSHELF_EMULATOR_DIR environment variable.
    #[serde(default = "default_emulator_dir")]
    pub emulator_dir: PathBuf,

    /// Parent of staging directories and download scratch space.
    ///
    /// Set via RETROSHELF_SCRATCH_DIR environment variable.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Base URL of the emulator CDN. Must end with `/`.
    ///
    /// Set via RETROSHELF_CDN_BASE_URL environment variable.
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: String,

    /// User-Agent string for outbound requests.
    ///
    /// Set via RETROSHELF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-download timeout in milliseconds.
    ///
    /// Set via RETROSHELF_DOWNLOAD_TIMEOUT_MS environment variable.
    #[serde(default = "default_download_timeout_ms")]
    pub download_timeout_ms: u64,

    /// Minimum seconds between two bulk syncs.
    ///
    /// Set via RETROSHELF_SYNC_COOLDOWN_SECS environment variable.
    #[serde(default = "default_sync_cooldown_secs")]
    pub sync_cooldown_secs: u64,

    /// Whether the rendered page is also kept gzip-compressed.
    ///
    /// Set via RETROSHELF_GZIP_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub gzip_enabled: bool,

    /// Largest accepted save upload in bytes.
    ///
    /// Set via RETROSHELF_MAX_UPLOAD_BYTES environment variable.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_web_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_template_path() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_emulator_dir() -> PathBuf {
    PathBuf::from("./emulatorjs")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("retroshelf")
}

fn default_cdn_base_url() -> String {
    "https://cdn.emulatorjs.org/latest/".into()
}

fn default_user_agent() -> String {
    "retroshelf/0.1".into()
}

fn default_download_timeout_ms() -> u64 {
    300_000
}

fn default_sync_cooldown_secs() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            web_root: default_web_root(),
            template_path: default_template_path(),
            data_dir: default_data_dir(),
            emulator_dir: default_emulator_dir(),
            scratch_dir: default_scratch_dir(),
            cdn_base_url: default_cdn_base_url(),
            user_agent: default_user_agent(),
            download_timeout_ms: default_download_timeout_ms(),
            sync_cooldown_secs: default_sync_cooldown_secs(),
            gzip_enabled: default_true(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    /// Download timeout as Duration for use with reqwest.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn sync_cooldown(&self) -> Duration {
        Duration::from_secs(self.sync_cooldown_secs)
    }

    /// One subdirectory per system, each holding ROM archives.
    pub fn roms_dir(&self) -> PathBuf {
        self.data_dir.join("roms")
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.data_dir.join("saves")
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        self.data_dir.join("bookmark.json")
    }

    pub fn sync_state_path(&self) -> PathBuf {
        self.data_dir.join("core_sync.json")
    }

    pub fn injection_log_path(&self) -> PathBuf {
        self.data_dir.join("injected.json")
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RETROSHELF_`
    /// 2. TOML file from `RETROSHELF_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RETROSHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RETROSHELF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
