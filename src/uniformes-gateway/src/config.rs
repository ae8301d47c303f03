//! Client configuration and backend address resolution.
//!
//! The backend address is not fixed at build time. It is resolved from, in
//! order: a runtime override, `UNIFORMES_API_URL`, the config file
//! (`~/.uniformes/config.json`), and finally `http://localhost:8000`.
//! `ApiEndpoint` holds the resolved address and is re-read by every call,
//! so changing it takes effect immediately.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use uniformes_login::{DEFAULT_STORAGE_KEY, default_data_dir};

use crate::constants::{API_URL_ENV_VAR, DEFAULT_API_URL};

const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("No home directory available for configuration")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend address chosen by the operator, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Overall per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds between background health probes.
    #[serde(default = "default_health_interval_secs")]
    pub health_check_interval_secs: u64,

    /// Key the session blob is persisted under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_health_interval_secs() -> u64 {
    30
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
            health_check_interval_secs: default_health_interval_secs(),
            storage_key: default_storage_key(),
        }
    }
}

impl ClientConfig {
    /// Standard config location (`<data dir>/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        default_data_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Load from the standard location, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|content| serde_json::from_str(&content).map_err(ConfigError::from))
        {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Save to the standard location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoDataDir)?;
        self.save_to(&path)
    }

    /// Save to `path` as pretty JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved client config");
        Ok(())
    }

    /// Backend address: environment, then this config, then the default.
    pub fn resolve_api_url(&self) -> String {
        std::env::var(API_URL_ENV_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Validate and normalize a backend address (no trailing slash).
pub fn normalize_base_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(trimmed.to_string())
}

/// Shared, runtime-mutable backend address.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base_url: Arc<RwLock<String>>,
}

impl ApiEndpoint {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Arc::new(RwLock::new(normalize_base_url(url)?)),
        })
    }

    /// Endpoint for the address `config` resolves to.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(&config.resolve_api_url())
    }

    /// Current base address.
    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    /// Point every subsequent call at a different backend.
    pub fn set_base_url(&self, url: &str) -> Result<(), ConfigError> {
        let normalized = normalize_base_url(url)?;
        info!(base_url = %normalized, "Backend address changed");
        *self.base_url.write() = normalized;
        Ok(())
    }
}
