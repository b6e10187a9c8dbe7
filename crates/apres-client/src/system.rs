//! System reset and housekeeping resources

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{info, instrument};

use apres_core::paths;
use apres_core::{parse_timestamp, HousekeepingStatus, ResetMessage};

use crate::document;
use crate::error::{ApresError, Result};
use crate::transport::Transport;

/// File name used for the housekeeping configuration
pub const HOUSEKEEPING_CONFIG_FILE: &str = "config.ini";

/// `system/*` endpoints
#[derive(Debug, Clone)]
pub struct SystemResource {
    transport: Arc<Transport>,
}

impl SystemResource {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Reset the radar; the device acknowledges with a message and its time
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<ResetMessage> {
        let response = self.transport.post_form(paths::SYSTEM_RESET, Vec::new()).await?;
        if response.status != StatusCode::ACCEPTED {
            return Err(response.unexpected());
        }

        let doc = response.json_object()?;
        let message = document::to_string("message", document::require(&doc, "message")?)?;
        let time = document::to_string("time", document::require(&doc, "time")?)?;
        let time = parse_timestamp(&time).map_err(|e| {
            ApresError::malformed(format!("time should be a YYYY-MM-DD HH:MM:SS timestamp: {}", e))
        })?;

        info!(%message, "System reset");
        Ok(ResetMessage { message, time })
    }

    /// Battery, clock and GPS telemetry
    #[instrument(skip(self))]
    pub async fn housekeeping_status(&self) -> Result<HousekeepingStatus> {
        let response = self.transport.get(paths::HOUSEKEEPING_STATUS, &[]).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }

        let doc = response.json_object()?;
        for key in ["batteryVoltage", "timeGPS", "timeVAB", "latitude", "longitude"] {
            document::require(&doc, key)?;
        }
        serde_json::from_value(serde_json::Value::Object(doc))
            .map_err(|e| ApresError::malformed(e.to_string()))
    }

    /// Housekeeping configuration file contents
    #[instrument(skip(self))]
    pub async fn housekeeping_config_text(&self) -> Result<String> {
        let response = self.transport.get(paths::HOUSEKEEPING_CONFIG, &[]).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }
        Ok(response.text())
    }

    /// Save the housekeeping configuration to `path` (default `config.ini`)
    #[instrument(skip(self))]
    pub async fn download_housekeeping_config(
        &self,
        path: Option<&Path>,
        overwrite: bool,
    ) -> Result<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(HOUSEKEEPING_CONFIG_FILE));
        if target.exists() && !overwrite {
            return Err(ApresError::FileExists(target));
        }

        let response = self.transport.get(paths::HOUSEKEEPING_CONFIG, &[]).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }
        tokio::fs::write(&target, &response.body).await?;

        info!(path = %target.display(), "Downloaded housekeeping config");
        Ok(target)
    }

    /// Upload a housekeeping configuration file
    #[instrument(skip(self))]
    pub async fn upload_housekeeping_config(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read(path).await?;
        self.upload_housekeeping_config_bytes(content).await
    }

    /// Upload housekeeping configuration contents
    #[instrument(skip(self, content))]
    pub async fn upload_housekeeping_config_bytes(&self, content: Vec<u8>) -> Result<()> {
        let part = Part::bytes(content)
            .file_name(HOUSEKEEPING_CONFIG_FILE)
            .mime_str("text/plain")?;
        let form = Form::new().part("file", part);

        let response = self
            .transport
            .post_multipart(paths::HOUSEKEEPING_CONFIG, form)
            .await?;
        match response.status {
            StatusCode::CREATED => {
                info!("Uploaded housekeeping config");
                Ok(())
            }
            StatusCode::BAD_REQUEST => Err(ApresError::NoFileUploaded(response.message())),
            _ => Err(response.unexpected()),
        }
    }
}
