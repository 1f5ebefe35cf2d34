//! Client configuration.
//!
//! Configuration can be built in code, parsed from a TOML file, or read
//! from environment variables.
//!
//! # Example Configuration File
//!
//! ```toml
//! base_url = "https://tasks.example.com/api"
//! storage_dir = "/var/lib/taskflow"
//! timeout_ms = 10000
//! log_bodies = false
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "TASKFLOW_API_URL";

/// Environment variable overriding the session storage directory.
pub const ENV_STORAGE_DIR: &str = "TASKFLOW_STORAGE_DIR";

/// Environment variable setting a request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "TASKFLOW_TIMEOUT_MS";

/// Configuration for [`Taskflow`](crate::Taskflow) and
/// [`ApiClient`](crate::client::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST service; endpoint paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding the persisted session. `None` keeps the session
    /// in memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Optional request timeout. No timeout beyond the transport default
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Include body previews in HTTP debug logs.
    #[serde(default)]
    pub log_bodies: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_dir: None,
            timeout_ms: None,
            log_bodies: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at `base_url` with defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads [`ENV_API_URL`], [`ENV_STORAGE_DIR`] and [`ENV_TIMEOUT_MS`].
    /// Unparseable timeouts are ignored.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build a configuration from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                ENV_API_URL => config.base_url = value.into(),
                ENV_STORAGE_DIR => config.storage_dir = Some(PathBuf::from(value.into())),
                ENV_TIMEOUT_MS => {
                    if let Ok(ms) = value.into().trim().parse::<u64>() {
                        config.timeout_ms = Some(ms);
                    }
                },
                _ => {},
            }
        }
        config
    }

    /// Set the storage directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Enable or disable body previews in HTTP logs.
    pub fn with_log_bodies(mut self, enable: bool) -> Self {
        self.log_bodies = enable;
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Default session directory: `<home>/.taskflow`.
    pub fn default_storage_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".taskflow"))
    }

    /// Parsed base URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base URL cannot carry paths: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Check the configuration for obvious mistakes.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.timeout_ms == Some(0) {
            return Err(Error::config("timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}
