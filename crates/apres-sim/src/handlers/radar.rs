//! Radar configuration, burst and results handlers

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use apres_core::paths;
use apres_core::{
    config_keys as keys, indexed_key, parse_antenna_csv, validate_af_gain, BurstKind,
    RadarConfig, ResultsStatus, MAX_ATTENUATORS, RF_ATTENUATION_MAX,
};

use crate::error::ApiError;
use crate::form::DeviceForm;
use crate::state::{BurstState, SimState, DATA_FILES_DIR, SURVEY_DIR};

/// GET /api/radar/config
pub async fn get_config(State(state): State<SimState>) -> Json<Map<String, Value>> {
    Json(state.lock().radar.to_document())
}

/// POST /api/radar/config
///
/// Fields are applied to a copy; the device keeps its old configuration if
/// any field is rejected.
pub async fn set_config(
    State(state): State<SimState>,
    form: DeviceForm,
) -> Result<Json<Map<String, Value>>, ApiError> {
    form.authenticate(&state.config().api_key)?;

    let mut device = state.lock();
    let mut radar = device.radar.clone();
    apply_form(&mut radar, &form)?;
    debug!(attenuators = radar.attenuators, "Radar config updated");
    device.radar = radar;

    Ok(Json(device.radar.to_document()))
}

fn parse_count(name: &str, value: &str) -> Result<u32, ApiError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ApiError::BadRequest(format!("{} should be an integer", name)))
}

/// Apply posted fields to `radar`
///
/// Scalar keys match case-insensitively. `rfAttn{i}` is clamped to the
/// attenuator range; `afGain{i}` must be a supported gain step.
pub fn apply_form(radar: &mut RadarConfig, form: &DeviceForm) -> Result<(), ApiError> {
    let mut attenuators = radar.attenuators;

    for (key, value) in form.fields() {
        match key.to_ascii_lowercase().as_str() {
            "nattenuators" => {
                let count = parse_count(keys::ATTENUATORS, value)? as usize;
                if !(1..=MAX_ATTENUATORS).contains(&count) {
                    return Err(ApiError::BadRequest(format!(
                        "nAttenuators should be integer in range [1, {}]",
                        MAX_ATTENUATORS
                    )));
                }
                attenuators = count;
            }
            "nsubbursts" => {
                radar.sub_bursts = parse_count(keys::SUB_BURSTS, value)?;
                if radar.sub_bursts < 1 {
                    return Err(ApiError::BadRequest(
                        "nSubBursts should be integer greater than or equal to 1".into(),
                    ));
                }
            }
            "naverages" => {
                radar.averages = parse_count(keys::AVERAGES, value)?;
                if radar.averages < 1 {
                    return Err(ApiError::BadRequest(
                        "nAverages should be integer greater than or equal to 1".into(),
                    ));
                }
            }
            "txantenna" => {
                radar.tx_antenna = parse_antenna_csv(keys::TX_ANTENNA, value)
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "rxantenna" => {
                radar.rx_antenna = parse_antenna_csv(keys::RX_ANTENNA, value)
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "userdata" => radar.user_data = value.clone(),
            _ => {}
        }
    }

    radar.resize_attenuators(attenuators);

    for index in 1..=attenuators {
        let rf_key = indexed_key(keys::RF_ATTENUATION, index);
        if let Some(value) = form.get(&rf_key) {
            let rf: f64 = value
                .trim()
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| ApiError::BadRequest(format!("{} should be a number", rf_key)))?;
            radar.rf_attenuation[index - 1] = rf.clamp(0.0, RF_ATTENUATION_MAX);
        }

        let af_key = indexed_key(keys::AF_GAIN, index);
        if let Some(value) = form.get(&af_key) {
            let af: i32 = value
                .trim()
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("{} should be an integer", af_key)))?;
            validate_af_gain(&af_key, af).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            radar.af_gain[index - 1] = af;
        }
    }

    Ok(())
}

/// POST /api/radar/trial-burst
pub async fn trial_burst(
    State(state): State<SimState>,
    form: DeviceForm,
) -> Result<Response, ApiError> {
    start_burst(&state, BurstKind::Trial, &form).await
}

/// POST /api/radar/burst
pub async fn burst(State(state): State<SimState>, form: DeviceForm) -> Result<Response, ApiError> {
    start_burst(&state, BurstKind::Full, &form).await
}

/// GET on a burst endpoint
pub async fn burst_via_get() -> ApiError {
    ApiError::Forbidden("Cannot start a burst using a GET request.".to_string())
}

fn survey_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ApiError::BadRequest(format!(
            "filename '{}' must be a plain file name",
            name
        )));
    }
    Ok(name)
}

/// Start a burst of `kind`
///
/// The pool file is picked and the device marked busy under the lock; a
/// named burst copies its data file after the lock is released.
async fn start_burst(
    state: &SimState,
    kind: BurstKind,
    form: &DeviceForm,
) -> Result<Response, ApiError> {
    form.authenticate(&state.config().api_key)?;

    let pool = state.data_pool().await?;
    if pool.is_empty() {
        return Err(ApiError::Internal(format!(
            "No data (*.dat) files found in {} directory.",
            DATA_FILES_DIR
        )));
    }

    let survey = match kind {
        BurstKind::Full => form
            .get("filename")
            .filter(|n| !n.trim().is_empty())
            .map(survey_name)
            .transpose()?,
        BurstKind::Trial => None,
    };

    let (source, previous) = {
        let mut device = state.lock();
        if device.burst.is_bursting() {
            return Err(ApiError::Forbidden("Radar is already bursting".to_string()));
        }

        let Some(source) = device.next_file(&pool) else {
            return Err(ApiError::Internal("Data file pool is empty".to_string()));
        };

        let filename = match survey {
            Some(name) => format!("{}/{}", SURVEY_DIR, name),
            None => format!("{}/{}", DATA_FILES_DIR, source),
        };
        info!(kind = %kind, %filename, "Burst started");
        let previous = std::mem::replace(
            &mut device.burst,
            BurstState::Bursting {
                kind,
                started_at: std::time::Instant::now(),
                filename,
            },
        );
        (source, previous)
    };

    if let Some(name) = survey {
        let local = state.local_folder();
        let copied = tokio::fs::copy(
            local.join(DATA_FILES_DIR).join(&source),
            local.join(SURVEY_DIR).join(name),
        )
        .await;
        if let Err(err) = copied {
            let mut device = state.lock();
            if device.burst.is_bursting() {
                device.burst = previous;
            }
            return Err(err.into());
        }
    }

    Ok(Redirect::to(&paths::route(paths::RADAR_RESULTS)).into_response())
}

/// GET /api/radar/results
///
/// A running burst finishes once its chirps have had time to run; the poll
/// that observes this still reports `chirping`.
pub async fn results(State(state): State<SimState>) -> Json<Value> {
    let mut device = state.lock();

    match device.burst.clone() {
        BurstState::Idle => Json(json!({ "status": ResultsStatus::Idle })),
        BurstState::Bursting {
            kind,
            started_at,
            filename,
        } => {
            let chirps = device.chirps(kind);
            let elapsed = started_at.elapsed();
            let seconds_per_chirp = state.config().seconds_per_chirp;
            let chirp_number = if seconds_per_chirp > 0.0 {
                ((elapsed.as_secs_f64() / seconds_per_chirp) as u32 + 1).min(chirps)
            } else {
                chirps
            };

            if elapsed >= state.burst_duration(chirps) {
                debug!(kind = %kind, "Burst finished");
                device.burst = BurstState::Finished { kind, filename };
            }

            Json(json!({
                "status": ResultsStatus::Chirping,
                "type": kind.wire_name(),
                "chirpNumber": chirp_number,
            }))
        }
        BurstState::Finished { kind, filename } => {
            let result = state.burst_result(&device, kind, &filename);
            Json(Value::Object(result.to_document()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form(fields: &[(&str, &str)]) -> DeviceForm {
        DeviceForm::new(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_grow_attenuators_fills_defaults() {
        let mut radar = RadarConfig::default();
        apply_form(&mut radar, &form(&[("nAttenuators", "3"), ("rfAttn2", "12.5")])).unwrap();

        assert_eq!(radar.attenuators, 3);
        assert_eq!(radar.rf_attenuation, vec![0.0, 12.5, 31.0]);
        assert_eq!(radar.af_gain, vec![-4, -14, -14]);
    }

    #[test]
    fn test_rf_attenuation_is_clamped() {
        let mut radar = RadarConfig::default();
        apply_form(&mut radar, &form(&[("rfAttn1", "40")])).unwrap();
        assert_eq!(radar.rf_attenuation, vec![31.0]);

        apply_form(&mut radar, &form(&[("rfAttn1", "-3")])).unwrap();
        assert_eq!(radar.rf_attenuation, vec![0.0]);
    }

    #[test]
    fn test_indexed_keys_beyond_count_are_ignored() {
        let mut radar = RadarConfig::default();
        apply_form(&mut radar, &form(&[("rfAttn2", "10")])).unwrap();
        assert_eq!(radar.rf_attenuation, vec![0.0]);
    }

    #[test]
    fn test_rejected_values() {
        let mut radar = RadarConfig::default();
        for fields in [
            vec![("nAttenuators", "5")],
            vec![("nAttenuators", "0")],
            vec![("nSubBursts", "0")],
            vec![("nAverages", "x")],
            vec![("afGain1", "3")],
            vec![("txAntenna", "1,2,0")],
            vec![("rfAttn1", "NaN")],
        ] {
            assert!(
                matches!(apply_form(&mut radar, &form(&fields)), Err(ApiError::BadRequest(_))),
                "{:?} should be rejected",
                fields
            );
        }
    }

    #[test]
    fn test_case_insensitive_scalar_keys() {
        let mut radar = RadarConfig::default();
        apply_form(
            &mut radar,
            &form(&[("naverages", "4"), ("USERDATA", "site"), ("rxAntenna", "0,1,0,0,0,0,0,0")]),
        )
        .unwrap();
        assert_eq!(radar.averages, 4);
        assert_eq!(radar.user_data, "site");
        assert_eq!(radar.rx_antenna, vec![0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_survey_name() {
        assert_eq!(survey_name(" site.dat ").unwrap(), "site.dat");
        assert!(survey_name("../etc").is_err());
        assert!(survey_name("..").is_err());
    }
}
