//! Simulator configuration
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file) yields a working simulator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use apres_core::RadarConfig;

use crate::error::SimError;

/// Key the simulated device accepts
pub const DEFAULT_API_KEY: &str = "18052021";

/// Complete simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Key required in the `apikey` field of every POST
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Folder holding `config.ini`, `data_files/` and `Survey/`
    #[serde(default = "default_local_folder")]
    pub local_folder: PathBuf,

    /// Simulated duration of one chirp, in seconds
    #[serde(default = "default_seconds_per_chirp")]
    pub seconds_per_chirp: f64,

    /// Write a sample data file when `data_files/` is empty
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,

    /// Entries per directory listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Housekeeping telemetry
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,

    /// Chirp configuration at power-up
    #[serde(default)]
    pub radar: RadarConfig,

    /// Chirp sweep reported in results
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_listen() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_local_folder() -> PathBuf {
    PathBuf::from("apres-data")
}

fn default_seconds_per_chirp() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    16
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_key: default_api_key(),
            local_folder: default_local_folder(),
            seconds_per_chirp: default_seconds_per_chirp(),
            seed_sample_data: true,
            page_size: default_page_size(),
            housekeeping: HousekeepingConfig::default(),
            radar: RadarConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

/// Battery and GPS values reported by housekeeping status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    #[serde(default = "default_battery_voltage")]
    pub battery_voltage: f64,

    /// Whether the GPS has a fix; without one time and position are blank
    #[serde(default)]
    pub gps_valid: bool,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,
}

fn default_battery_voltage() -> f64 {
    13.0
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            battery_voltage: default_battery_voltage(),
            gps_valid: false,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

/// Frequency sweep of each chirp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_start_frequency")]
    pub start_frequency: f64,

    #[serde(default = "default_stop_frequency")]
    pub stop_frequency: f64,

    /// Chirp period in seconds
    #[serde(default = "default_period")]
    pub period: f64,
}

fn default_start_frequency() -> f64 {
    2e8
}

fn default_stop_frequency() -> f64 {
    4e8
}

fn default_period() -> f64 {
    1.0
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_frequency: default_start_frequency(),
            stop_frequency: default_stop_frequency(),
            period: default_period(),
        }
    }
}

impl SimConfig {
    /// Configuration rooted at `local_folder`, otherwise default
    pub fn with_local_folder(local_folder: impl Into<PathBuf>) -> Self {
        Self {
            local_folder: local_folder.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(text: &str) -> Result<Self, SimError> {
        let config: Self = toml::from_str(text).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the simulator cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.seconds_per_chirp.is_finite() || self.seconds_per_chirp < 0.0 {
            return Err(SimError::Config(format!(
                "seconds_per_chirp must be a non-negative number, got {}",
                self.seconds_per_chirp
            )));
        }
        if self.page_size == 0 {
            return Err(SimError::Config("page_size must be at least 1".into()));
        }
        if !self.radar.is_consistent() {
            return Err(SimError::Config(
                "radar rf_attenuation and af_gain must have one entry per attenuator".into(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(SimError::Config("api_key must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimConfig::from_toml("").unwrap();
        assert_eq!(config.api_key, "18052021");
        assert_eq!(config.listen, "127.0.0.1:8000");
        assert_eq!(config.page_size, 16);
        assert_eq!(config.radar, RadarConfig::default());
        assert_eq!(config.housekeeping.battery_voltage, 13.0);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
listen = "0.0.0.0:8080"
local_folder = "/var/lib/apres"
seconds_per_chirp = 0.05

[housekeeping]
gps_valid = true
latitude = -75.1
longitude = 123.3

[radar]
attenuators = 2
sub_bursts = 10
averages = 3
rf_attenuation = [10.0, 20.0]
af_gain = [-4, 6]
"#;
        let config = SimConfig::from_toml(toml).unwrap();
        assert_eq!(config.local_folder, PathBuf::from("/var/lib/apres"));
        assert_eq!(config.seconds_per_chirp, 0.05);
        assert!(config.housekeeping.gps_valid);
        assert_eq!(config.radar.attenuators, 2);
        assert_eq!(config.radar.tx_antenna.len(), 8);
        assert_eq!(config.sweep.period, 1.0);
    }

    #[test]
    fn test_rejects_inconsistent_radar() {
        let toml = r#"
[radar]
attenuators = 3
sub_bursts = 1
averages = 1
rf_attenuation = [10.0]
af_gain = [-4]
"#;
        assert!(matches!(SimConfig::from_toml(toml), Err(SimError::Config(_))));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = SimConfig::from_toml(include_str!("../config/apres-sim.toml")).unwrap();
        assert_eq!(config.radar, RadarConfig::default());
        assert_eq!(config.sweep.start_frequency, 2e8);
    }

    #[test]
    fn test_rejects_negative_chirp_time() {
        assert!(SimConfig::from_toml("seconds_per_chirp = -1.0").is_err());
    }
}
