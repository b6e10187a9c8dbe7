//! System reset and housekeeping handlers

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use apres_core::timestamp::now_local;
use apres_core::{HousekeepingStatus, ResetMessage};

use crate::error::ApiError;
use crate::form::DeviceForm;
use crate::state::{BurstState, SimState};

/// POST /api/system/reset
pub async fn reset(
    State(state): State<SimState>,
    form: DeviceForm,
) -> Result<impl IntoResponse, ApiError> {
    form.authenticate(&state.config().api_key)?;

    state.lock().burst = BurstState::Idle;
    info!("Device reset");

    Ok((
        StatusCode::ACCEPTED,
        Json(ResetMessage {
            message: "Resetting dummy ApRES".to_string(),
            time: now_local(),
        }),
    ))
}

/// GET /api/system/housekeeping/status
pub async fn housekeeping_status(State(state): State<SimState>) -> Json<HousekeepingStatus> {
    let hk = &state.config().housekeeping;
    let status = if hk.gps_valid {
        HousekeepingStatus {
            battery_voltage: hk.battery_voltage,
            time_gps: Some(now_local()),
            time_vab: Some(now_local()),
            latitude: hk.latitude,
            longitude: hk.longitude,
        }
    } else {
        HousekeepingStatus {
            battery_voltage: hk.battery_voltage,
            time_gps: None,
            time_vab: Some(now_local()),
            latitude: 0.0,
            longitude: 0.0,
        }
    };
    Json(status)
}

/// GET /api/system/housekeeping/config
pub async fn get_housekeeping_config(
    State(state): State<SimState>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.config_path();
    match tokio::fs::read(&path).await {
        Ok(content) => Ok(([(CONTENT_TYPE, "text/plain")], content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("/api/system/housekeeping/config".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/system/housekeeping/config
///
/// Stores the first uploaded file and echoes it back.
pub async fn upload_housekeeping_config(
    State(state): State<SimState>,
    form: DeviceForm,
) -> Result<impl IntoResponse, ApiError> {
    form.authenticate(&state.config().api_key)?;

    let file = form
        .file()
        .ok_or_else(|| ApiError::BadRequest("No file uploaded.".to_string()))?;
    tokio::fs::write(state.config_path(), &file.content).await?;
    info!(bytes = file.content.len(), file = %file.file_name, "Updated housekeeping config");

    Ok((
        StatusCode::CREATED,
        [(CONTENT_TYPE, "text/plain")],
        file.content.clone(),
    ))
}
