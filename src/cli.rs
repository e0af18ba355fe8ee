//! Command-line argument parsing for databricks-mcp.

use crate::config::{PollingConfig, WarehouseSettings};
use clap::Parser;
use std::path::PathBuf;

/// MCP server exposing a Databricks SQL warehouse as LLM tools over stdio.
#[derive(Parser, Debug)]
#[command(name = "databricks-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Databricks workspace host (e.g., adb-123.azuredatabricks.net)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Databricks personal access token
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// SQL warehouse id
    #[arg(long, value_name = "ID")]
    pub warehouse_id: Option<String>,

    /// Seconds between statement status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for a statement before reporting a timeout
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Write logs to a file instead of stderr (default location if PATH is omitted)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,

    /// Serve tools against an in-memory mock warehouse (no credentials needed)
    #[arg(long)]
    pub mock_warehouse: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the log file to write to, if file logging was requested.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .map(|path| path.unwrap_or_else(crate::logging::default_log_path))
    }

    /// Converts CLI arguments to warehouse settings, ready to merge over the config file.
    pub fn to_warehouse_settings(&self) -> WarehouseSettings {
        WarehouseSettings {
            host: self.host.clone(),
            token: self.token.clone(),
            warehouse_id: self.warehouse_id.clone(),
            ..Default::default()
        }
    }

    /// Overrides polling settings given on the command line.
    pub fn apply_polling_overrides(&self, polling: &mut PollingConfig) {
        if let Some(interval) = self.poll_interval {
            polling.interval_seconds = interval;
        }
        if let Some(max_wait) = self.max_wait {
            polling.max_wait_seconds = max_wait;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_warehouse_args() {
        let cli = parse_args(&[
            "databricks-mcp",
            "--host",
            "adb-123.azuredatabricks.net",
            "--token",
            "dapi-secret",
            "--warehouse-id",
            "abc123",
        ]);

        assert_eq!(cli.host, Some("adb-123.azuredatabricks.net".to_string()));
        assert_eq!(cli.token, Some("dapi-secret".to_string()));
        assert_eq!(cli.warehouse_id, Some("abc123".to_string()));
        assert!(!cli.mock_warehouse);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = parse_args(&["databricks-mcp", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/path/to/config.toml"));
    }

    #[test]
    fn test_default_config_path() {
        let cli = parse_args(&["databricks-mcp"]);
        assert!(cli.config_path().ends_with("databricks-mcp/config.toml"));
    }

    #[test]
    fn test_to_warehouse_settings() {
        let cli = parse_args(&["databricks-mcp", "--warehouse-id", "abc123"]);
        let settings = cli.to_warehouse_settings();

        assert_eq!(settings.host, None);
        assert_eq!(settings.token, None);
        assert_eq!(settings.warehouse_id, Some("abc123".to_string()));
        assert_eq!(settings.http_timeout_seconds, 30);
    }

    #[test]
    fn test_polling_overrides() {
        let cli = parse_args(&["databricks-mcp", "--poll-interval", "2"]);
        let mut polling = PollingConfig {
            interval_seconds: 5,
            max_wait_seconds: 120,
        };
        cli.apply_polling_overrides(&mut polling);

        assert_eq!(polling.interval_seconds, 2);
        assert_eq!(polling.max_wait_seconds, 120);

        let cli = parse_args(&["databricks-mcp", "--max-wait", "30"]);
        cli.apply_polling_overrides(&mut polling);
        assert_eq!(polling.max_wait_seconds, 30);
    }

    #[test]
    fn test_mock_warehouse_and_log_file() {
        let cli = parse_args(&[
            "databricks-mcp",
            "--mock-warehouse",
            "--log-file",
            "/tmp/databricks-mcp.log",
        ]);
        assert!(cli.mock_warehouse);
        assert_eq!(cli.log_path(), Some(PathBuf::from("/tmp/databricks-mcp.log")));
    }

    #[test]
    fn test_log_file_without_path_uses_default() {
        let cli = parse_args(&["databricks-mcp", "--log-file"]);
        assert_eq!(cli.log_path(), Some(crate::logging::default_log_path()));

        let cli = parse_args(&["databricks-mcp"]);
        assert_eq!(cli.log_path(), None);
    }

    #[test]
    fn test_invalid_poll_interval_is_rejected() {
        assert!(Cli::try_parse_from(["databricks-mcp", "--poll-interval", "soon"]).is_err());
    }
}
