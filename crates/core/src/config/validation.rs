//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::net::SocketAddr;

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `listen_addr` is not a socket address
    /// - `download_timeout_ms` is less than 100ms or exceeds one hour
    /// - `cdn_base_url` is not an http(s) URL ending in `/`
    /// - `user_agent` is empty
    /// - `max_upload_bytes` is 0
    ///
    /// Returns `ConfigError::Missing` if `template_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid {
                field: "listen_addr".into(),
                reason: format!("'{}' is not a socket address", self.listen_addr),
            });
        }

        if self.download_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "download_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.download_timeout_ms > 3_600_000 {
            return Err(ConfigError::Invalid {
                field: "download_timeout_ms".into(),
                reason: "must not exceed 1 hour (3600000ms)".into(),
            });
        }

        let cdn = Url::parse(&self.cdn_base_url)
            .map_err(|e| ConfigError::Invalid { field: "cdn_base_url".into(), reason: format!("invalid URL: {e}") })?;
        if !matches!(cdn.scheme(), "http" | "https") || cdn.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "cdn_base_url".into(), reason: "must be an http(s) URL".into() });
        }
        if !cdn.path().ends_with('/') {
            return Err(ConfigError::Invalid { field: "cdn_base_url".into(), reason: "must end with '/'".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_upload_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.template_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "template_path".into(),
                hint: "Set RETROSHELF_TEMPLATE_PATH to the page template".into(),
            });
        }

        if self.sync_cooldown_secs == 0 {
            tracing::warn!("sync_cooldown_secs is 0; bulk sync is not rate limited");
        }

        Ok(())
    }
}
