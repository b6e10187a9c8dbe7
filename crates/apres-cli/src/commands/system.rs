//! System commands - reset, housekeeping status and config file

use anyhow::{Context, Result};
use apres_client::{format_timestamp, ApresClient};
use std::path::{Path, PathBuf};

use crate::output::OutputContext;

/// Show battery, clock and GPS telemetry
pub async fn status(client: &ApresClient, ctx: &OutputContext) -> Result<()> {
    let status = client.system().housekeeping_status().await?;

    let pairs = vec![
        ("Battery voltage", format!("{:.2} V", status.battery_voltage)),
        (
            "Device time",
            status.time_vab.as_ref().map(format_timestamp).unwrap_or_else(|| "-".into()),
        ),
        (
            "GPS time",
            status.time_gps.as_ref().map(format_timestamp).unwrap_or_else(|| "-".into()),
        ),
        ("Latitude", status.latitude.to_string()),
        ("Longitude", status.longitude.to_string()),
    ];

    ctx.print_kv(&pairs, &status);
    Ok(())
}

/// Reset the radar
pub async fn reset(client: &ApresClient, ctx: &OutputContext) -> Result<()> {
    ctx.info("Resetting radar...");
    let result = client.system().reset().await?;
    ctx.success(&format!("{} ({})", result.message, format_timestamp(&result.time)));
    Ok(())
}

/// Print the housekeeping config file
pub async fn show_hk_config(client: &ApresClient) -> Result<()> {
    let text = client.system().housekeeping_config_text().await?;
    print!("{}", text);
    Ok(())
}

/// Save the housekeeping config file locally
pub async fn download_hk_config(
    client: &ApresClient,
    path: Option<&Path>,
    force: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let saved: PathBuf = client
        .system()
        .download_housekeeping_config(path, force)
        .await
        .context("Failed to download housekeeping config")?;
    ctx.success(&format!("Saved {}", saved.display()));
    Ok(())
}

/// Replace the housekeeping config file on the radar
pub async fn upload_hk_config(client: &ApresClient, path: &Path, ctx: &OutputContext) -> Result<()> {
    client
        .system()
        .upload_housekeeping_config(path)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;
    ctx.success(&format!("Uploaded {}", path.display()));
    Ok(())
}
