//! Client settings with YAML/TOML support

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApresError, Result};

/// Key sent until the caller configures one; the device rejects it
pub const DEFAULT_API_KEY: &str = "INVALID";

/// Client settings
///
/// Can be loaded from YAML, TOML, or constructed with [`ClientSettings::builder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Device root URL, e.g. `http://radar.localnet`
    pub root: String,

    /// Shared-secret key added to every POST
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Per-request timeout in milliseconds (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Connect timeout in milliseconds (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Delay between results polls in milliseconds (default: 250ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Results deadline budget per chirp in milliseconds (default: 2s)
    #[serde(default = "default_per_chirp")]
    pub per_chirp_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_timeout(),
            connect_ms: default_connect_timeout(),
            poll_interval_ms: default_poll_interval(),
            per_chirp_ms: default_per_chirp(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_poll_interval() -> u64 {
    250
}

fn default_per_chirp() -> u64 {
    2_000
}

impl TimeoutsConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn per_chirp(&self) -> Duration {
        Duration::from_millis(self.per_chirp_ms)
    }
}

impl ClientSettings {
    /// Settings with defaults for the given root URL
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            api_key: default_api_key(),
            timeouts: TimeoutsConfig::default(),
        }
    }

    /// Load settings from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ApresError::Settings(e.to_string()))
    }

    /// Parse settings from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ApresError::Settings(e.to_string()))
    }

    /// Create a builder for programmatic configuration
    pub fn builder(root: impl Into<String>) -> ClientSettingsBuilder {
        ClientSettingsBuilder {
            settings: Self::new(root),
        }
    }
}

/// Builder for [`ClientSettings`]
#[derive(Debug, Clone)]
pub struct ClientSettingsBuilder {
    settings: ClientSettings,
}

impl ClientSettingsBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.api_key = key.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeouts.request_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeouts.connect_ms = timeout.as_millis() as u64;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.timeouts.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn per_chirp_budget(mut self, budget: Duration) -> Self {
        self.settings.timeouts.per_chirp_ms = budget.as_millis() as u64;
        self
    }

    pub fn build(self) -> ClientSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
root: "http://radar.localnet"
api_key: "18052021"

timeouts:
  request_ms: 5000
  poll_interval_ms: 100
"#;

        let settings = ClientSettings::from_yaml(yaml).unwrap();
        assert_eq!(settings.root, "http://radar.localnet");
        assert_eq!(settings.api_key, "18052021");
        assert_eq!(settings.timeouts.request(), Duration::from_secs(5));
        assert_eq!(settings.timeouts.poll_interval(), Duration::from_millis(100));
        // Unspecified values fall back to defaults
        assert_eq!(settings.timeouts.per_chirp(), Duration::from_secs(2));
    }

    #[test]
    fn test_from_toml_defaults() {
        let settings = ClientSettings::from_toml(r#"root = "http://192.168.1.1""#).unwrap();
        assert_eq!(settings.api_key, DEFAULT_API_KEY);
        assert_eq!(settings.timeouts.request(), Duration::from_secs(30));
        assert_eq!(settings.timeouts.connect(), Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let settings = ClientSettings::builder("http://localhost:8000")
            .api_key("secret")
            .per_chirp_budget(Duration::from_millis(50))
            .build();
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.timeouts.per_chirp_ms, 50);
    }

    #[test]
    fn test_missing_root_is_rejected() {
        assert!(matches!(
            ClientSettings::from_yaml("api_key: x"),
            Err(ApresError::Settings(_))
        ));
    }
}
