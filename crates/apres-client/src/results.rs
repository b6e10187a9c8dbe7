//! Results document parsing

use serde_json::{Map, Value};

use apres_core::{
    result_keys as keys, BurstDetail, BurstKind, BurstResult, FullData, ResultsStatus, TrialData,
};

use crate::document;
use crate::error::{ApresError, Result};

/// One observation of `GET /api/radar/results`
#[derive(Debug, Clone, PartialEq)]
pub enum BurstStatus {
    /// No burst has been started since power-up or reset
    Idle,
    /// A burst is running; carries the raw progress payload
    Chirping(Value),
    /// The last burst finished
    Finished(BurstResult),
}

impl BurstStatus {
    pub fn status(&self) -> ResultsStatus {
        match self {
            Self::Idle => ResultsStatus::Idle,
            Self::Chirping(_) => ResultsStatus::Chirping,
            Self::Finished(_) => ResultsStatus::Finished,
        }
    }
}

/// Interpret a results payload
///
/// `expected` is the kind of the last burst started by this client; it is
/// used when the payload carries no `type` key.
pub fn parse_results(payload: &Value, expected: Option<BurstKind>) -> Result<BurstStatus> {
    let doc = payload
        .as_object()
        .ok_or_else(|| ApresError::malformed("Results response is not a JSON object"))?;

    let status = document::to_string(keys::STATUS, document::require(doc, keys::STATUS)?)?;
    match ResultsStatus::from_wire(&status) {
        Some(ResultsStatus::Idle) => Ok(BurstStatus::Idle),
        Some(ResultsStatus::Chirping) => Ok(BurstStatus::Chirping(payload.clone())),
        Some(ResultsStatus::Finished) => parse_finished(doc, expected).map(BurstStatus::Finished),
        None => Err(ApresError::malformed(format!(
            "Unknown results status '{}'",
            status
        ))),
    }
}

/// Build a [`BurstResult`] from a `finished` results document
pub fn parse_finished(doc: &Map<String, Value>, expected: Option<BurstKind>) -> Result<BurstResult> {
    let kind = match document::optional(doc, keys::TYPE, document::to_string)? {
        Some(name) => BurstKind::from_wire(&name)
            .ok_or_else(|| ApresError::malformed(format!("Unknown burst type '{}'", name)))?,
        None => expected
            .ok_or_else(|| ApresError::malformed(format!("No {} key in response.", keys::TYPE)))?,
    };

    let attenuators = document::to_attenuator_count(
        keys::ATTENUATORS,
        document::require(doc, keys::ATTENUATORS)?,
    )?;

    let detail = match kind {
        BurstKind::Trial => BurstDetail::Trial(TrialData {
            averages: document::to_u32(keys::AVERAGES, document::require(doc, keys::AVERAGES)?)?,
            histogram: document::optional(doc, keys::HISTOGRAM, document::to_f64_rows)?
                .unwrap_or_default(),
            chirp: document::optional(doc, keys::CHIRP, document::to_f64_rows)?
                .unwrap_or_default(),
        }),
        BurstKind::Full => BurstDetail::Full(FullData {
            sub_bursts: document::to_u32(
                keys::SUB_BURSTS,
                document::require(doc, keys::SUB_BURSTS)?,
            )?,
            filename: document::to_string(keys::FILENAME, document::require(doc, keys::FILENAME)?)?,
        }),
    };

    Ok(BurstResult {
        attenuators,
        rf_attenuation: document::optional(doc, keys::RF_ATTENUATION, document::to_f64_vec)?
            .unwrap_or_default(),
        af_gain: document::optional(doc, keys::AF_GAIN, document::to_i32_vec)?.unwrap_or_default(),
        start_frequency: document::optional(doc, keys::START_FREQUENCY, document::to_f64)?,
        stop_frequency: document::optional(doc, keys::STOP_FREQUENCY, document::to_f64)?,
        period: document::optional(doc, keys::PERIOD, document::to_f64)?,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_idle_and_chirping() {
        assert_eq!(parse_results(&json!({"status": "idle"}), None).unwrap(), BurstStatus::Idle);

        let payload = json!({"status": "chirping", "type": "trial", "chirpNumber": 3});
        let status = parse_results(&payload, None).unwrap();
        assert_eq!(status.status(), ResultsStatus::Chirping);
        assert_eq!(status, BurstStatus::Chirping(payload));
    }

    #[test]
    fn test_finished_trial() {
        let payload = json!({
            "status": "finished",
            "type": "trial",
            "nAttenuators": "2",
            "nAverages": 4,
            "rfAttn": [10.0, 20.0],
            "afGain": [-4, 6],
            "startFrequency": 2e8,
            "stopFrequency": 4e8,
            "period": 1,
            "histogram": [[1, 2], [3, 4]],
            "chirp": [[0.5], [0.25]]
        });
        let BurstStatus::Finished(result) = parse_results(&payload, None).unwrap() else {
            panic!("expected finished");
        };
        assert_eq!(result.kind(), BurstKind::Trial);
        assert_eq!(result.attenuators, 2);
        assert_eq!(result.af_gain, vec![-4, 6]);
        assert_eq!(result.period, Some(1.0));
        let trial = result.trial().unwrap();
        assert_eq!(trial.averages, 4);
        assert_eq!(trial.histogram.len(), 2);
        assert_eq!(trial.chirp[1], vec![0.25]);
    }

    #[test]
    fn test_kind_falls_back_to_last_started() {
        let payload = json!({
            "status": "finished",
            "nAttenuators": 1,
            "nSubBursts": 10,
            "filename": "Survey/site.dat"
        });
        let BurstStatus::Finished(result) =
            parse_results(&payload, Some(BurstKind::Full)).unwrap()
        else {
            panic!("expected finished");
        };
        assert_eq!(result.full().unwrap().filename, "Survey/site.dat");

        assert!(matches!(
            parse_results(&payload, None),
            Err(ApresError::MalformedResponse(m)) if m.contains("type")
        ));
    }

    #[test]
    fn test_missing_required_keys() {
        let trial = json!({"status": "finished", "type": "trial", "nAttenuators": 1});
        assert!(matches!(
            parse_results(&trial, None),
            Err(ApresError::MalformedResponse(m)) if m.contains("nAverages")
        ));

        let full = json!({"status": "finished", "type": "burst", "nAttenuators": 1, "nSubBursts": 1});
        assert!(matches!(
            parse_results(&full, None),
            Err(ApresError::MalformedResponse(m)) if m.contains("filename")
        ));

        assert!(matches!(
            parse_results(&json!({"chirpNumber": 1}), None),
            Err(ApresError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_finished_rejects_attenuator_count() {
        for count in [json!(0), json!("9"), json!(1_000_000_000_000u64)] {
            let payload = json!({
                "status": "finished",
                "type": "trial",
                "nAttenuators": count,
                "nAverages": 1
            });
            assert!(matches!(
                parse_results(&payload, None),
                Err(ApresError::MalformedResponse(m)) if m.contains("nAttenuators")
            ));
        }
    }

    #[test]
    fn test_roundtrip_from_core_document() {
        let result = BurstResult {
            attenuators: 1,
            rf_attenuation: vec![31.0],
            af_gain: vec![-14],
            start_frequency: None,
            stop_frequency: None,
            period: None,
            detail: BurstDetail::Full(FullData {
                sub_bursts: 2,
                filename: "data/DATA2021-05-18-1304.DAT".into(),
            }),
        };
        let parsed = parse_finished(&result.to_document(), None).unwrap();
        assert_eq!(parsed, result);
    }
}
