//! Burst kinds, results polling status and finished-burst results

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::paths;

/// Wire keys of the results document
pub mod result_keys {
    pub const STATUS: &str = "status";
    pub const TYPE: &str = "type";
    pub const CHIRP_NUMBER: &str = "chirpNumber";
    pub const ATTENUATORS: &str = "nAttenuators";
    pub const RF_ATTENUATION: &str = "rfAttn";
    pub const AF_GAIN: &str = "afGain";
    pub const START_FREQUENCY: &str = "startFrequency";
    pub const STOP_FREQUENCY: &str = "stopFrequency";
    pub const PERIOD: &str = "period";
    pub const AVERAGES: &str = "nAverages";
    pub const HISTOGRAM: &str = "histogram";
    pub const CHIRP: &str = "chirp";
    pub const SUB_BURSTS: &str = "nSubBursts";
    pub const FILENAME: &str = "filename";
}

/// Kind of radar burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurstKind {
    /// Preview burst; averaged chirps are returned inline
    #[serde(rename = "trial")]
    Trial,
    /// Survey burst; chirps are persisted to a data file on the device
    #[serde(rename = "burst")]
    Full,
}

impl BurstKind {
    /// Value of the `type` key in results documents
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Full => "burst",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "trial" | "trial-burst" => Some(Self::Trial),
            "burst" | "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Endpoint that starts this kind of burst
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Trial => paths::RADAR_TRIAL_BURST,
            Self::Full => paths::RADAR_BURST,
        }
    }
}

impl fmt::Display for BurstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial => write!(f, "trial burst"),
            Self::Full => write!(f, "burst"),
        }
    }
}

/// Value of the `status` key returned by `GET /api/radar/results`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsStatus {
    /// No burst has been started
    Idle,
    /// A burst is in progress
    Chirping,
    /// The last burst finished and its result is available
    Finished,
}

impl ResultsStatus {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "idle" => Some(Self::Idle),
            "chirping" => Some(Self::Chirping),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Result of a finished burst
#[derive(Debug, Clone, PartialEq)]
pub struct BurstResult {
    pub attenuators: usize,
    pub rf_attenuation: Vec<f64>,
    pub af_gain: Vec<i32>,
    pub start_frequency: Option<f64>,
    pub stop_frequency: Option<f64>,
    pub period: Option<f64>,
    pub detail: BurstDetail,
}

/// Kind-specific part of a burst result
#[derive(Debug, Clone, PartialEq)]
pub enum BurstDetail {
    Trial(TrialData),
    Full(FullData),
}

/// Inline data returned by a trial burst
#[derive(Debug, Clone, PartialEq)]
pub struct TrialData {
    /// Chirps averaged per attenuator setting
    pub averages: u32,
    /// Sample histogram, one row per attenuator setting
    pub histogram: Vec<Vec<f64>>,
    /// Deramped chirp, one row per attenuator setting
    pub chirp: Vec<Vec<f64>>,
}

/// Location of the data written by a full burst
#[derive(Debug, Clone, PartialEq)]
pub struct FullData {
    pub sub_bursts: u32,
    /// Path of the data file on the device
    pub filename: String,
}

impl BurstResult {
    pub fn kind(&self) -> BurstKind {
        match self.detail {
            BurstDetail::Trial(_) => BurstKind::Trial,
            BurstDetail::Full(_) => BurstKind::Full,
        }
    }

    pub fn trial(&self) -> Option<&TrialData> {
        match &self.detail {
            BurstDetail::Trial(data) => Some(data),
            BurstDetail::Full(_) => None,
        }
    }

    pub fn full(&self) -> Option<&FullData> {
        match &self.detail {
            BurstDetail::Full(data) => Some(data),
            BurstDetail::Trial(_) => None,
        }
    }

    /// Render the `finished` results document
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(result_keys::STATUS.into(), json!(ResultsStatus::Finished));
        doc.insert(result_keys::TYPE.into(), json!(self.kind().wire_name()));
        doc.insert(result_keys::ATTENUATORS.into(), json!(self.attenuators));
        doc.insert(result_keys::RF_ATTENUATION.into(), json!(self.rf_attenuation));
        doc.insert(result_keys::AF_GAIN.into(), json!(self.af_gain));
        if let Some(f) = self.start_frequency {
            doc.insert(result_keys::START_FREQUENCY.into(), json!(f));
        }
        if let Some(f) = self.stop_frequency {
            doc.insert(result_keys::STOP_FREQUENCY.into(), json!(f));
        }
        if let Some(p) = self.period {
            doc.insert(result_keys::PERIOD.into(), json!(p));
        }
        match &self.detail {
            BurstDetail::Trial(data) => {
                doc.insert(result_keys::AVERAGES.into(), json!(data.averages));
                doc.insert(result_keys::HISTOGRAM.into(), json!(data.histogram));
                doc.insert(result_keys::CHIRP.into(), json!(data.chirp));
            }
            BurstDetail::Full(data) => {
                doc.insert(result_keys::SUB_BURSTS.into(), json!(data.sub_bursts));
                doc.insert(result_keys::FILENAME.into(), json!(data.filename));
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(BurstKind::Trial.wire_name(), "trial");
        assert_eq!(BurstKind::Full.wire_name(), "burst");
        assert_eq!(BurstKind::from_wire("burst"), Some(BurstKind::Full));
        assert_eq!(BurstKind::from_wire("survey"), None);
        assert_eq!(BurstKind::Trial.endpoint(), "radar/trial-burst");
        assert_eq!(
            serde_json::to_value(BurstKind::Full).unwrap(),
            serde_json::json!("burst")
        );
    }

    #[test]
    fn test_full_result_document() {
        let result = BurstResult {
            attenuators: 1,
            rf_attenuation: vec![10.0],
            af_gain: vec![6],
            start_frequency: Some(2e8),
            stop_frequency: Some(4e8),
            period: Some(1.0),
            detail: BurstDetail::Full(FullData {
                sub_bursts: 5,
                filename: "Survey/a.dat".into(),
            }),
        };
        let doc = result.to_document();
        assert_eq!(doc["status"], "finished");
        assert_eq!(doc["type"], "burst");
        assert_eq!(doc["nSubBursts"], 5);
        assert_eq!(doc["filename"], "Survey/a.dat");
        assert!(!doc.contains_key("histogram"));
        assert!(result.trial().is_none());
    }
}
