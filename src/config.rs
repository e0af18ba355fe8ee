//! Configuration management for databricks-mcp.
//!
//! Handles loading configuration from TOML files and environment variables:
//! warehouse credentials and the default statement polling policy.

use crate::engine::PollPolicy;
use crate::error::{Result, WarehouseMcpError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Environment variable holding the workspace host.
pub const HOST_ENV: &str = "DATABRICKS_HOST";

/// Environment variable holding the personal access token.
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

/// Environment variable holding the SQL warehouse id.
pub const WAREHOUSE_ID_ENV: &str = "DATABRICKS_WAREHOUSE_ID";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Warehouse connection settings.
    #[serde(default)]
    pub warehouse: WarehouseSettings,

    /// Default polling policy for statements.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Warehouse connection settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSettings {
    /// Workspace host, e.g. `https://adb-123.azuredatabricks.net`.
    pub host: Option<String>,

    /// Personal access token (prefer the environment over the config file).
    pub token: Option<String>,

    /// SQL warehouse id.
    pub warehouse_id: Option<String>,

    /// Timeout for individual HTTP requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            warehouse_id: None,
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

/// Fully resolved warehouse configuration, ready to build a client from.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Workspace base URL, always ending in `/`.
    pub host: Url,
    pub token: String,
    pub warehouse_id: String,
    pub http_timeout: Duration,
}

impl WarehouseConfig {
    /// Returns a display-safe string (no token).
    pub fn display_string(&self) -> String {
        let host = self.host.host_str().unwrap_or("unknown");
        format!("warehouse {} @ {}", self.warehouse_id, host)
    }
}

impl WarehouseSettings {
    /// Merges another settings block into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &WarehouseSettings) {
        if other.host.is_some() {
            self.host = other.host.clone();
        }
        if other.token.is_some() {
            self.token = other.token.clone();
        }
        if other.warehouse_id.is_some() {
            self.warehouse_id = other.warehouse_id.clone();
        }
        if other.http_timeout_seconds != default_http_timeout() {
            self.http_timeout_seconds = other.http_timeout_seconds;
        }
    }

    /// Applies environment variables (DATABRICKS_HOST, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    /// Fills missing values from the given lookup function.
    fn apply_defaults_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if self.host.is_none() {
            self.host = non_empty(HOST_ENV);
        }
        if self.token.is_none() {
            self.token = non_empty(TOKEN_ENV);
        }
        if self.warehouse_id.is_none() {
            self.warehouse_id = non_empty(WAREHOUSE_ID_ENV);
        }
    }

    /// Validates the settings and produces a resolved configuration.
    pub fn resolve(&self) -> Result<WarehouseConfig> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push(HOST_ENV);
        }
        if self.token.is_none() {
            missing.push(TOKEN_ENV);
        }
        if self.warehouse_id.is_none() {
            missing.push(WAREHOUSE_ID_ENV);
        }

        let (Some(host), Some(token), Some(warehouse_id)) =
            (&self.host, &self.token, &self.warehouse_id)
        else {
            return Err(WarehouseMcpError::config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        };

        if self.http_timeout_seconds == 0 {
            return Err(WarehouseMcpError::config(
                "http_timeout_seconds must be greater than zero",
            ));
        }

        Ok(WarehouseConfig {
            host: parse_host(host)?,
            token: token.clone(),
            warehouse_id: warehouse_id.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_seconds),
        })
    }
}

/// Parses a workspace host, adding `https://` when no scheme is given.
pub fn parse_host(host: &str) -> Result<Url> {
    let host = host.trim();
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| WarehouseMcpError::config(format!("Invalid Databricks host '{host}': {e}")))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(WarehouseMcpError::config(format!(
            "Invalid scheme '{}'. Expected 'https' or 'http'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(WarehouseMcpError::config(format!(
            "Databricks host '{host}' has no hostname"
        )));
    }

    // Relative joins against the base URL need a trailing slash
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Polling policy settings as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status polls.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Total budget before a statement is reported as timed out.
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
}

fn default_interval() -> u64 {
    crate::engine::DEFAULT_POLL_INTERVAL_SECS
}

fn default_max_wait() -> u64 {
    crate::engine::DEFAULT_MAX_WAIT_SECS
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_wait_seconds: default_max_wait(),
        }
    }
}

impl PollingConfig {
    /// Converts the settings into a validated poll policy.
    pub fn to_policy(&self) -> Result<PollPolicy> {
        let policy = PollPolicy::from_secs(self.interval_seconds, self.max_wait_seconds);
        policy.validate()?;
        Ok(policy)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("databricks-mcp")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WarehouseMcpError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            WarehouseMcpError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
