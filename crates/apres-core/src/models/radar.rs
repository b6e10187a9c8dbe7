//! Radar chirp configuration
//!
//! On the wire the per-attenuator settings are flattened into indexed keys
//! (`rfAttn1`, `afGain1`, `rfAttn2`, ...). Antenna masks travel as JSON
//! arrays in responses and as CSV strings in form posts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ModelError;

/// Highest number of attenuator settings a burst can cycle through
pub const MAX_ATTENUATORS: usize = 4;
/// Number of antenna selection flags on MIMO boards
pub const ANTENNA_COUNT: usize = 8;
/// AF gain steps accepted by the device, in dB
pub const AF_GAIN_STEPS: [i32; 3] = [-14, -4, 6];
/// Upper bound of the RF attenuator, in dB
pub const RF_ATTENUATION_MAX: f64 = 31.0;
/// Value given to a newly enabled RF attenuator slot
pub const DEFAULT_RF_ATTENUATION: f64 = 31.0;
/// Value given to a newly enabled AF gain slot
pub const DEFAULT_AF_GAIN: i32 = -14;

/// Wire keys of the radar configuration document
pub mod config_keys {
    pub const SUB_BURSTS: &str = "nSubBursts";
    pub const ATTENUATORS: &str = "nAttenuators";
    pub const AVERAGES: &str = "nAverages";
    pub const RF_ATTENUATION: &str = "rfAttn";
    pub const AF_GAIN: &str = "afGain";
    pub const TX_ANTENNA: &str = "txAntenna";
    pub const RX_ANTENNA: &str = "rxAntenna";
    pub const USER_DATA: &str = "userData";
}

/// Indexed wire key for a per-attenuator field (1-based): `rfAttn2`
pub fn indexed_key(field: &str, index: usize) -> String {
    format!("{}{}", field, index)
}

/// Radar chirp configuration as reported by `GET /api/radar/config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarConfig {
    /// Number of attenuator settings (1-4)
    pub attenuators: usize,
    /// Chirps per full burst
    pub sub_bursts: u32,
    /// Chirps averaged per trial burst
    pub averages: u32,
    /// RF attenuation per setting, in dB
    pub rf_attenuation: Vec<f64>,
    /// AF gain per setting, in dB
    pub af_gain: Vec<i32>,
    /// Active transmit antennas
    #[serde(default = "default_antenna_mask")]
    pub tx_antenna: Vec<u8>,
    /// Active receive antennas
    #[serde(default = "default_antenna_mask")]
    pub rx_antenna: Vec<u8>,
    /// Opaque user string stored alongside the configuration
    #[serde(default)]
    pub user_data: String,
}

fn default_antenna_mask() -> Vec<u8> {
    let mut mask = vec![0; ANTENNA_COUNT];
    mask[0] = 1;
    mask
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            attenuators: 1,
            sub_bursts: 1,
            averages: 1,
            rf_attenuation: vec![0.0],
            af_gain: vec![-4],
            tx_antenna: default_antenna_mask(),
            rx_antenna: default_antenna_mask(),
            user_data: String::new(),
        }
    }
}

impl RadarConfig {
    /// Whether both attenuator arrays match the attenuator count
    pub fn is_consistent(&self) -> bool {
        self.rf_attenuation.len() == self.attenuators && self.af_gain.len() == self.attenuators
    }

    /// Resize the per-attenuator arrays, filling new slots with device defaults
    pub fn resize_attenuators(&mut self, attenuators: usize) {
        self.attenuators = attenuators;
        self.rf_attenuation.resize(attenuators, DEFAULT_RF_ATTENUATION);
        self.af_gain.resize(attenuators, DEFAULT_AF_GAIN);
    }

    /// Render the flattened wire document
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(config_keys::SUB_BURSTS.into(), json!(self.sub_bursts));
        doc.insert(config_keys::ATTENUATORS.into(), json!(self.attenuators));
        doc.insert(config_keys::AVERAGES.into(), json!(self.averages));
        for (i, rf) in self.rf_attenuation.iter().enumerate() {
            doc.insert(indexed_key(config_keys::RF_ATTENUATION, i + 1), json!(rf));
        }
        for (i, af) in self.af_gain.iter().enumerate() {
            doc.insert(indexed_key(config_keys::AF_GAIN, i + 1), json!(af));
        }
        doc.insert(config_keys::TX_ANTENNA.into(), json!(self.tx_antenna));
        doc.insert(config_keys::RX_ANTENNA.into(), json!(self.rx_antenna));
        doc.insert(config_keys::USER_DATA.into(), json!(self.user_data));
        doc
    }
}

/// Render an antenna mask as the CSV accepted by the device (`1,0,0,0,0,0,0,0`)
pub fn antenna_csv(mask: &[u8]) -> String {
    mask.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse an antenna CSV into 0/1 flags
pub fn parse_antenna_csv(field: &str, text: &str) -> Result<Vec<u8>, ModelError> {
    text.split(',')
        .map(|part| match part.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(ModelError::InvalidAntennaFlag {
                field: field.to_string(),
                value: other.to_string(),
            }),
        })
        .collect()
}

/// Check a complete antenna mask: eight 0/1 flags, at least one set
pub fn validate_antenna_mask(field: &str, mask: &[u8]) -> Result<(), ModelError> {
    if mask.len() != ANTENNA_COUNT {
        return Err(ModelError::AntennaLength {
            field: field.to_string(),
            expected: ANTENNA_COUNT,
            actual: mask.len(),
        });
    }
    if let Some(bad) = mask.iter().find(|v| **v > 1) {
        return Err(ModelError::InvalidAntennaFlag {
            field: field.to_string(),
            value: bad.to_string(),
        });
    }
    if !mask.contains(&1) {
        return Err(ModelError::NoActiveAntenna {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Check an AF gain against the steps the amplifier supports
pub fn validate_af_gain(field: &str, value: i32) -> Result<(), ModelError> {
    if AF_GAIN_STEPS.contains(&value) {
        Ok(())
    } else {
        Err(ModelError::InvalidAfGain {
            field: field.to_string(),
            value,
        })
    }
}
