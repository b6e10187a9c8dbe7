//! System reset and housekeeping documents

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timestamp::{device_format, optional_device_format};

/// Acknowledgement returned by `POST /api/system/reset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetMessage {
    pub message: String,
    #[serde(with = "device_format")]
    pub time: NaiveDateTime,
}

/// Telemetry returned by `GET /api/system/housekeeping/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousekeepingStatus {
    #[serde(rename = "batteryVoltage")]
    pub battery_voltage: f64,
    /// GPS time, `None` without a fix
    #[serde(rename = "timeGPS", with = "optional_device_format")]
    pub time_gps: Option<NaiveDateTime>,
    /// Time of the VAB (radar board) clock
    #[serde(rename = "timeVAB", with = "optional_device_format")]
    pub time_vab: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_without_gps_fix() {
        let status: HousekeepingStatus = serde_json::from_str(
            r#"{"batteryVoltage":13.0,"timeGPS":"","timeVAB":"2021-05-18 10:00:00","latitude":0,"longitude":0.0}"#,
        )
        .unwrap();
        assert_eq!(status.time_gps, None);
        assert!(status.time_vab.is_some());
        assert_eq!(status.latitude, 0.0);
    }

    #[test]
    fn test_status_rejects_non_numeric_voltage() {
        let result = serde_json::from_str::<HousekeepingStatus>(
            r#"{"batteryVoltage":"high","timeGPS":"","timeVAB":"","latitude":0,"longitude":0}"#,
        );
        assert!(result.is_err());
    }
}
