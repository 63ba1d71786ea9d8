//! TOML configuration.
//!
//! Resolution order for the config file: explicit path, then
//! `SENTIVIEW_CONFIG`, then `<config_dir>/sentiview/config.toml`. A missing
//! file yields defaults. Environment overrides are applied after loading.
//!
//! ```toml
//! [api]
//! base_url = "https://reviews.example.com/api"
//! timeout_secs = 20
//!
//! [cache]
//! dedupe_ms = 2000
//! retry_count = 3
//!
//! [storage]
//! state_dir = "/var/lib/sentiview"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Project name used for config and state directories.
pub const PROJECT_NAME: &str = "sentiview";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SENTIVIEW_CONFIG";

/// Base URL used when nothing else is configured.
pub const FALLBACK_BASE_URL: &str = "http://localhost:8000/api";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentiviewConfig {
    /// Backend API settings.
    pub api: ApiConfig,
    /// Request cache settings.
    pub cache: CacheConfig,
    /// Persistent state settings.
    pub storage: StorageConfig,
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Explicit base URL; resolved from the environment when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 20,
            access_token: None,
        }
    }
}

/// Request cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Window in which identical requests are served from cache.
    pub dedupe_ms: u64,
    /// Retries for transient failures.
    pub retry_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dedupe_ms: 2_000,
            retry_count: 3,
        }
    }
}

/// Persistent state settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted filter and source state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl SentiviewConfig {
    /// `<config_dir>/sentiview/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PROJECT_NAME).join("config.toml"))
    }

    /// Resolves the config file location.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Loads the resolved config file (defaults when absent) and applies
    /// environment overrides.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parses a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = toml::from_str(&raw)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Applies `SENTIVIEW_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("SENTIVIEW_ACCESS_TOKEN") {
            self.api.access_token = Some(token);
        }
        if let Some(timeout) = lookup("SENTIVIEW_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.timeout_secs = timeout;
        }
        if let Some(dir) = lookup("SENTIVIEW_STATE_DIR") {
            self.storage.state_dir = Some(PathBuf::from(dir));
        }
    }

    /// The backend base URL: configured value, else per-environment variable,
    /// else [`FALLBACK_BASE_URL`].
    pub fn base_url<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = self.api.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return url.clone();
        }
        resolve_base_url(lookup)
    }

    /// Directory for persisted stores: configured value, else
    /// `<data_dir>/sentiview`.
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.state_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(PROJECT_NAME))
            .ok_or_else(|| Error::config("Could not determine data directory for this platform"))
    }
}

/// Picks the API URL for the current `SENTIVIEW_ENV`.
///
/// `development` reads `SENTIVIEW_API_DEV_URL`, `production` reads
/// `SENTIVIEW_API_PROD_URL`, anything else reads `SENTIVIEW_API_URL`.
pub fn resolve_base_url<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let var = match lookup("SENTIVIEW_ENV").as_deref() {
        Some("development") => "SENTIVIEW_API_DEV_URL",
        Some("production") => "SENTIVIEW_API_PROD_URL",
        _ => "SENTIVIEW_API_URL",
    };
    lookup(var)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_BASE_URL.to_string())
}
