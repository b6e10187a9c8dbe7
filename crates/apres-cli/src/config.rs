//! Configuration file handling for apres-cli

use anyhow::{Context, Result};
use apres_client::TimeoutsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default radar root URL
    pub server: Option<String>,
    /// API key sent with every POST
    pub api_key: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Request and results timeouts
    pub timeouts: Option<TimeoutsConfig>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("apres-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        server: Option<&str>,
        api_key: Option<&str>,
        output: Option<&str>,
        no_color: bool,
    ) -> MergedConfig {
        MergedConfig {
            server: server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            api_key: api_key.map(String::from).or_else(|| self.api_key.clone()),
            output: output
                .map(String::from)
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| "table".to_string()),
            no_color: no_color || self.no_color.unwrap_or(false),
            timeouts: self.timeouts.clone().unwrap_or_default(),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub api_key: Option<String>,
    pub output: String,
    pub no_color: bool,
    pub timeouts: TimeoutsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_file() {
        let config: Config = toml::from_str(
            r#"
server = "http://radar.localnet"
api_key = "18052021"
output = "json"

[timeouts]
per_chirp_ms = 5000
"#,
        )
        .unwrap();

        let merged = config.merge_with_args(Some("http://10.0.0.2"), None, None, false);
        assert_eq!(merged.server, "http://10.0.0.2");
        assert_eq!(merged.api_key.as_deref(), Some("18052021"));
        assert_eq!(merged.output, "json");
        assert_eq!(merged.timeouts.per_chirp_ms, 5000);
        assert_eq!(merged.timeouts.poll_interval_ms, 250);
    }

    #[test]
    fn test_defaults_without_file() {
        let merged = Config::default().merge_with_args(None, None, None, true);
        assert_eq!(merged.server, DEFAULT_SERVER);
        assert!(merged.api_key.is_none());
        assert_eq!(merged.output, "table");
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
