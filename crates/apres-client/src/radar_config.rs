//! Radar chirp configuration resource

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::StatusCode;
use tracing::{debug, info, instrument};

use apres_core::paths;
use apres_core::{
    antenna_csv, config_keys as keys, indexed_key, validate_antenna_mask, RadarConfig,
    MAX_ATTENUATORS,
};

use crate::document::{self, Document};
use crate::error::{ApresError, Result};
use crate::transport::Transport;

/// How a per-attenuator parameter is supplied to [`RadarConfigResource::set`]
#[derive(Debug, Clone, PartialEq)]
pub enum AttenuatorSetting<T> {
    /// One value; only valid when a single attenuator is configured
    Scalar(T),
    /// One entry per attenuator; `None` keeps the current value
    Sequence(Vec<Option<T>>),
    /// Explicit indexed keys, e.g. `rfAttn2 -> 10.0`
    Sparse(BTreeMap<String, T>),
}

impl<T: Copy> AttenuatorSetting<T> {
    /// Sequence that sets every attenuator
    pub fn all(values: impl IntoIterator<Item = T>) -> Self {
        Self::Sequence(values.into_iter().map(Some).collect())
    }

    pub fn sparse<K: Into<String>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        Self::Sparse(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Resolve into a 1-based index -> value map for `count` attenuators
    pub fn normalize(&self, field: &str, count: usize) -> Result<BTreeMap<usize, T>> {
        match self {
            Self::Scalar(value) => {
                if count != 1 {
                    return Err(ApresError::InvalidArgument(format!(
                        "{} given as a single value but {} attenuators are configured",
                        field, count
                    )));
                }
                Ok(BTreeMap::from([(1, *value)]))
            }
            Self::Sequence(values) => {
                if values.len() != count {
                    return Err(ApresError::InvalidArgument(format!(
                        "{} expects {} values, got {}",
                        field,
                        count,
                        values.len()
                    )));
                }
                Ok(values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|v| (i + 1, v)))
                    .collect())
            }
            Self::Sparse(entries) => entries
                .iter()
                .map(|(key, value)| {
                    let index = key
                        .strip_prefix(field)
                        .and_then(|suffix| suffix.parse::<usize>().ok())
                        .filter(|i| (1..=count).contains(i))
                        .ok_or_else(|| ApresError::InvalidKey(key.clone()))?;
                    Ok((index, *value))
                })
                .collect(),
        }
    }
}

impl<T> From<Vec<T>> for AttenuatorSetting<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Some).collect())
    }
}

impl From<f64> for AttenuatorSetting<f64> {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<i32> for AttenuatorSetting<i32> {
    fn from(value: i32) -> Self {
        Self::Scalar(value)
    }
}

/// Partial configuration update; unset fields keep their device value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub attenuators: Option<usize>,
    pub sub_bursts: Option<u32>,
    pub averages: Option<u32>,
    pub rf_attenuation: Option<AttenuatorSetting<f64>>,
    pub af_gain: Option<AttenuatorSetting<i32>>,
    pub tx_antenna: Option<Vec<u8>>,
    pub rx_antenna: Option<Vec<u8>>,
    pub user_data: Option<String>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attenuators(mut self, count: usize) -> Self {
        self.attenuators = Some(count);
        self
    }

    pub fn sub_bursts(mut self, count: u32) -> Self {
        self.sub_bursts = Some(count);
        self
    }

    pub fn averages(mut self, count: u32) -> Self {
        self.averages = Some(count);
        self
    }

    pub fn rf_attenuation(mut self, setting: impl Into<AttenuatorSetting<f64>>) -> Self {
        self.rf_attenuation = Some(setting.into());
        self
    }

    pub fn af_gain(mut self, setting: impl Into<AttenuatorSetting<i32>>) -> Self {
        self.af_gain = Some(setting.into());
        self
    }

    pub fn tx_antenna(mut self, mask: Vec<u8>) -> Self {
        self.tx_antenna = Some(mask);
        self
    }

    pub fn rx_antenna(mut self, mask: Vec<u8>) -> Self {
        self.rx_antenna = Some(mask);
        self
    }

    pub fn user_data(mut self, data: impl Into<String>) -> Self {
        self.user_data = Some(data.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A requested value that must be visible after the update
struct Expectation {
    field: String,
    requested: String,
    check: Box<dyn Fn(&RadarConfig) -> Option<String> + Send>,
}

impl Expectation {
    /// `read` returns the device value, `None` when the field is absent
    fn new<T, F>(field: String, requested: T, read: F) -> Self
    where
        T: PartialEq + Display + Send + 'static,
        F: Fn(&RadarConfig) -> Option<T> + Send + 'static,
    {
        let text = requested.to_string();
        Self {
            field,
            requested: text,
            check: Box::new(move |config| match read(config) {
                Some(actual) if actual == requested => None,
                Some(actual) => Some(actual.to_string()),
                None => Some("<missing>".to_string()),
            }),
        }
    }
}

fn mask_text(mask: &[u8]) -> String {
    format!("[{}]", antenna_csv(mask))
}

/// Access to `radar/config` with a cached copy of the last fetched state
#[derive(Debug, Clone)]
pub struct RadarConfigResource {
    transport: Arc<Transport>,
    cache: Arc<RwLock<Option<RadarConfig>>>,
}

impl RadarConfigResource {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Configuration from the last successful `get`/`set`, if any
    pub fn cached(&self) -> Option<RadarConfig> {
        self.cache.read().clone()
    }

    /// Fetch the current configuration and refresh the cache
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<RadarConfig> {
        let response = self.transport.get(paths::RADAR_CONFIG, &[]).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }

        let config = parse_config_document(&response.json_object()?)?;
        debug!(attenuators = config.attenuators, "Fetched radar config");
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Apply a partial update and verify the device persisted it
    #[instrument(skip(self))]
    pub async fn set(&self, update: ConfigUpdate) -> Result<RadarConfig> {
        let baseline = self.get().await?;

        let mut fields: Vec<(String, String)> = Vec::new();
        let mut expected: Vec<Expectation> = Vec::new();

        if let Some(count) = update.attenuators {
            if !(1..=MAX_ATTENUATORS).contains(&count) {
                return Err(ApresError::InvalidArgument(format!(
                    "Number of attenuators must be between 1 and {}, got {}",
                    MAX_ATTENUATORS, count
                )));
            }
            fields.push((keys::ATTENUATORS.into(), count.to_string()));
            expected.push(Expectation::new(keys::ATTENUATORS.into(), count, |c| {
                Some(c.attenuators)
            }));
        }
        let effective = update.attenuators.unwrap_or(baseline.attenuators);

        for (key, value) in [
            (keys::SUB_BURSTS, update.sub_bursts),
            (keys::AVERAGES, update.averages),
        ] {
            let Some(value) = value else { continue };
            if value < 1 {
                return Err(ApresError::InvalidArgument(format!(
                    "{} must be at least 1",
                    key
                )));
            }
            fields.push((key.into(), value.to_string()));
            let read: fn(&RadarConfig) -> Option<u32> = if key == keys::SUB_BURSTS {
                |c| Some(c.sub_bursts)
            } else {
                |c| Some(c.averages)
            };
            expected.push(Expectation::new(key.into(), value, read));
        }

        if let Some(setting) = &update.rf_attenuation {
            for (index, value) in setting.normalize(keys::RF_ATTENUATION, effective)? {
                let key = indexed_key(keys::RF_ATTENUATION, index);
                fields.push((key.clone(), value.to_string()));
                expected.push(Expectation::new(key, value, move |c| {
                    c.rf_attenuation.get(index - 1).copied()
                }));
            }
        }

        if let Some(setting) = &update.af_gain {
            for (index, value) in setting.normalize(keys::AF_GAIN, effective)? {
                let key = indexed_key(keys::AF_GAIN, index);
                fields.push((key.clone(), value.to_string()));
                expected.push(Expectation::new(key, value, move |c| {
                    c.af_gain.get(index - 1).copied()
                }));
            }
        }

        for (key, mask) in [
            (keys::TX_ANTENNA, &update.tx_antenna),
            (keys::RX_ANTENNA, &update.rx_antenna),
        ] {
            let Some(mask) = mask else { continue };
            validate_antenna_mask(key, mask)
                .map_err(|e| ApresError::InvalidArgument(e.to_string()))?;
            fields.push((key.into(), antenna_csv(mask)));
            let requested = mask_text(mask);
            let read: fn(&RadarConfig) -> Option<String> = if key == keys::TX_ANTENNA {
                |c| Some(mask_text(&c.tx_antenna))
            } else {
                |c| Some(mask_text(&c.rx_antenna))
            };
            expected.push(Expectation::new(key.into(), requested, read));
        }

        if let Some(data) = &update.user_data {
            fields.push((keys::USER_DATA.into(), data.clone()));
            expected.push(Expectation::new(keys::USER_DATA.into(), data.clone(), |c| {
                Some(c.user_data.clone())
            }));
        }

        let response = self.transport.post_form(paths::RADAR_CONFIG, fields).await?;
        match response.status {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => {
                return Err(ApresError::MalformedResponse(response.message()));
            }
            _ => return Err(response.unexpected()),
        }

        let updated = self.get().await?;
        for expectation in &expected {
            if let Some(actual) = (expectation.check)(&updated) {
                return Err(ApresError::UpdateNotApplied {
                    field: expectation.field.clone(),
                    requested: expectation.requested.clone(),
                    actual,
                });
            }
        }

        info!(fields = expected.len(), "Radar config updated");
        Ok(updated)
    }
}

/// Build a [`RadarConfig`] from the flattened `radar/config` document
pub(crate) fn parse_config_document(doc: &Document) -> Result<RadarConfig> {
    let sub_bursts = document::to_u32(keys::SUB_BURSTS, document::require(doc, keys::SUB_BURSTS)?)?;
    let attenuators = document::to_attenuator_count(
        keys::ATTENUATORS,
        document::require(doc, keys::ATTENUATORS)?,
    )?;
    let averages = document::to_u32(keys::AVERAGES, document::require(doc, keys::AVERAGES)?)?;

    let mut rf_attenuation = Vec::with_capacity(attenuators);
    let mut af_gain = Vec::with_capacity(attenuators);
    for index in 1..=attenuators {
        let rf_key = indexed_key(keys::RF_ATTENUATION, index);
        rf_attenuation.push(document::to_f64(&rf_key, document::require(doc, &rf_key)?)?);
        let af_key = indexed_key(keys::AF_GAIN, index);
        af_gain.push(document::to_i32(&af_key, document::require(doc, &af_key)?)?);
    }

    let defaults = RadarConfig::default();
    let tx_antenna = document::optional(doc, keys::TX_ANTENNA, document::to_flags)?
        .unwrap_or(defaults.tx_antenna);
    let rx_antenna = document::optional(doc, keys::RX_ANTENNA, document::to_flags)?
        .unwrap_or(defaults.rx_antenna);
    let user_data = document::optional(doc, keys::USER_DATA, document::to_string)?
        .unwrap_or_default();

    Ok(RadarConfig {
        attenuators,
        sub_bursts,
        averages,
        rf_attenuation,
        af_gain,
        tx_antenna,
        rx_antenna,
        user_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_requires_single_attenuator() {
        assert_eq!(
            AttenuatorSetting::Scalar(10.0).normalize("rfAttn", 1).unwrap(),
            BTreeMap::from([(1, 10.0)])
        );
        assert!(matches!(
            AttenuatorSetting::Scalar(10.0).normalize("rfAttn", 2),
            Err(ApresError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sequence_length_and_holes() {
        let setting = AttenuatorSetting::Sequence(vec![Some(-4), None, Some(6)]);
        assert_eq!(
            setting.normalize("afGain", 3).unwrap(),
            BTreeMap::from([(1, -4), (3, 6)])
        );
        assert!(matches!(
            AttenuatorSetting::all([1.0, 2.0]).normalize("rfAttn", 3),
            Err(ApresError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sparse_keys() {
        let setting = AttenuatorSetting::sparse([("rfAttn2", 10.0), ("rfAttn3", 20.0)]);
        assert_eq!(
            setting.normalize("rfAttn", 3).unwrap(),
            BTreeMap::from([(2, 10.0), (3, 20.0)])
        );

        let out_of_range = AttenuatorSetting::sparse([("rfAttn4", 5.0)]);
        assert!(matches!(
            out_of_range.normalize("rfAttn", 3),
            Err(ApresError::InvalidKey(k)) if k == "rfAttn4"
        ));
        let zero = AttenuatorSetting::sparse([("rfAttn0", 5.0)]);
        assert!(matches!(zero.normalize("rfAttn", 3), Err(ApresError::InvalidKey(_))));
        let wrong_field = AttenuatorSetting::sparse([("afGain1", 5.0)]);
        assert!(matches!(wrong_field.normalize("rfAttn", 3), Err(ApresError::InvalidKey(_))));
    }

    #[test]
    fn test_update_builder() {
        assert!(ConfigUpdate::new().is_empty());
        let update = ConfigUpdate::new().attenuators(2).rf_attenuation(vec![1.0, 2.0]);
        assert!(!update.is_empty());
        assert_eq!(update.rf_attenuation, Some(AttenuatorSetting::all([1.0, 2.0])));
    }

    #[test]
    fn test_parse_document_with_string_numbers() {
        let doc = json!({
            "nSubBursts": "10",
            "nAttenuators": 2,
            "nAverages": 3,
            "rfAttn1": "12.5",
            "rfAttn2": 31,
            "afGain1": -4,
            "afGain2": "6",
            "txAntenna": [1, 0, 0, 0, 0, 0, 0, 0],
            "rxAntenna": [0, 1, 0, 0, 0, 0, 0, 0],
            "userData": "site A"
        });
        let config = parse_config_document(doc.as_object().unwrap()).unwrap();
        assert_eq!(config.sub_bursts, 10);
        assert_eq!(config.rf_attenuation, vec![12.5, 31.0]);
        assert_eq!(config.af_gain, vec![-4, 6]);
        assert_eq!(config.rx_antenna[1], 1);
        assert_eq!(config.user_data, "site A");
        assert!(config.is_consistent());
    }

    #[test]
    fn test_parse_document_missing_indexed_key() {
        let doc = json!({
            "nSubBursts": 1,
            "nAttenuators": 2,
            "nAverages": 1,
            "rfAttn1": 0,
            "afGain1": -4,
            "afGain2": -4
        });
        let err = parse_config_document(doc.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ApresError::MalformedResponse(m) if m.contains("rfAttn2")));
    }

    #[test]
    fn test_parse_document_rejects_attenuator_count() {
        for count in [json!(0), json!(5), json!(1_000_000_000_000u64)] {
            let doc = json!({
                "nSubBursts": 1,
                "nAttenuators": count,
                "nAverages": 1,
                "rfAttn1": 0,
                "afGain1": -4
            });
            let err = parse_config_document(doc.as_object().unwrap()).unwrap_err();
            assert!(
                matches!(&err, ApresError::MalformedResponse(m) if m.contains("nAttenuators")),
                "unexpected error for {}: {:?}",
                count,
                err
            );
        }
    }
}
