//! Radar commands - chirp configuration and bursts

use anyhow::{bail, Context, Result};
use apres_client::{
    ApresClient, AttenuatorSetting, BurstKind, BurstResult, ConfigUpdate, RadarConfig,
};
use clap::Args;
use indicatif::ProgressBar;
use serde_json::Value;
use std::str::FromStr;

use crate::output::{mask, AttenuatorRow, OutputContext, OutputFormat};

/// Flags for the set-config command
#[derive(Debug, Args)]
pub struct SetConfigArgs {
    /// Number of attenuator settings (1-4)
    #[arg(long)]
    pub attenuators: Option<usize>,

    /// Chirps per full burst
    #[arg(long)]
    pub sub_bursts: Option<u32>,

    /// Chirps averaged per trial burst
    #[arg(long)]
    pub averages: Option<u32>,

    /// RF attenuation in dB: `10,20,31` for all settings or `rfAttn2=10` for one
    #[arg(long = "rf-attn", value_name = "VALUES")]
    pub rf_attenuation: Vec<String>,

    /// AF gain in dB (-14, -4 or 6): `6,-4` for all settings or `afGain1=6` for one
    #[arg(long = "af-gain", value_name = "VALUES", allow_hyphen_values = true)]
    pub af_gain: Vec<String>,

    /// Transmit antenna mask, e.g. `1,0,0,0,0,0,0,0`
    #[arg(long = "tx")]
    pub tx_antenna: Option<String>,

    /// Receive antenna mask, e.g. `1,0,0,0,0,0,0,0`
    #[arg(long = "rx")]
    pub rx_antenna: Option<String>,

    /// Opaque user string stored with the configuration
    #[arg(long)]
    pub user_data: Option<String>,
}

impl SetConfigArgs {
    fn to_update(&self) -> Result<ConfigUpdate> {
        let mut update = ConfigUpdate::new();
        update.attenuators = self.attenuators;
        update.sub_bursts = self.sub_bursts;
        update.averages = self.averages;
        update.rf_attenuation = parse_setting(&self.rf_attenuation)?;
        update.af_gain = parse_setting(&self.af_gain)?;
        update.tx_antenna = self.tx_antenna.as_deref().map(parse_mask).transpose()?;
        update.rx_antenna = self.rx_antenna.as_deref().map(parse_mask).transpose()?;
        update.user_data = self.user_data.clone();
        Ok(update)
    }
}

/// Parse attenuator values given on the command line
///
/// `key=value` items form a sparse update. Otherwise a single value is a
/// scalar and a comma-separated list is a full sequence.
pub fn parse_setting<T>(values: &[String]) -> Result<Option<AttenuatorSetting<T>>>
where
    T: FromStr + Copy,
    T::Err: std::fmt::Display,
{
    let parse = |text: &str| {
        text.trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value '{}': {}", text.trim(), e))
    };

    if values.is_empty() {
        return Ok(None);
    }

    if values.iter().all(|v| v.contains('=')) {
        let mut entries = Vec::with_capacity(values.len());
        for item in values {
            let (key, value) = item
                .split_once('=')
                .context("Expected key=value")?;
            entries.push((key.trim().to_string(), parse(value)?));
        }
        return Ok(Some(AttenuatorSetting::sparse(entries)));
    }

    if values.iter().any(|v| v.contains('=')) {
        bail!("Cannot mix key=value items with plain values");
    }

    let items: Vec<&str> = values.iter().flat_map(|v| v.split(',')).collect();
    if items.len() == 1 {
        return Ok(Some(AttenuatorSetting::Scalar(parse(items[0])?)));
    }
    let parsed = items.into_iter().map(parse).collect::<Result<Vec<T>>>()?;
    Ok(Some(AttenuatorSetting::all(parsed)))
}

fn parse_mask(text: &str) -> Result<Vec<u8>> {
    text.split(',')
        .map(|v| {
            v.trim()
                .parse::<u8>()
                .with_context(|| format!("Invalid antenna flag '{}'", v.trim()))
        })
        .collect()
}

/// Show the current chirp configuration
pub async fn config(client: &ApresClient, ctx: &OutputContext) -> Result<()> {
    let config = client.radar_config().get().await?;
    print_config(&config, ctx);
    Ok(())
}

/// Update the chirp configuration and show the result
pub async fn set_config(
    client: &ApresClient,
    args: &SetConfigArgs,
    ctx: &OutputContext,
) -> Result<()> {
    let update = args.to_update()?;
    if update.is_empty() {
        bail!("Nothing to change; pass at least one setting");
    }

    let config = client
        .radar_config()
        .set(update)
        .await
        .context("Failed to update radar configuration")?;
    ctx.success("Configuration updated");
    print_config(&config, ctx);
    Ok(())
}

fn print_config(config: &RadarConfig, ctx: &OutputContext) {
    let pairs = vec![
        ("Attenuators", config.attenuators.to_string()),
        ("Sub-bursts", config.sub_bursts.to_string()),
        ("Averages", config.averages.to_string()),
        ("Tx antenna", mask(&config.tx_antenna)),
        ("Rx antenna", mask(&config.rx_antenna)),
        ("User data", config.user_data.clone()),
    ];
    ctx.print_kv(&pairs, &config.to_document());

    if ctx.format == OutputFormat::Table {
        let rows = attenuator_rows(&config.rf_attenuation, &config.af_gain, None);
        ctx.print(&rows);
    }
}

fn attenuator_rows(rf: &[f64], af: &[i32], result: Option<&BurstResult>) -> Vec<AttenuatorRow> {
    let trial = result.and_then(BurstResult::trial);
    let row_len = |rows: Option<&Vec<Vec<f64>>>, i: usize| {
        rows.and_then(|r| r.get(i))
            .map(|r| r.len().to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    rf.iter()
        .zip(af)
        .enumerate()
        .map(|(i, (rf, af))| AttenuatorRow {
            index: i + 1,
            rf_attenuation: rf.to_string(),
            af_gain: af.to_string(),
            histogram_bins: row_len(trial.map(|t| &t.histogram), i),
            chirp_samples: row_len(trial.map(|t| &t.chirp), i),
        })
        .collect()
}

/// Poll for results until done, aborting on Ctrl+C
async fn wait_for_results(client: &ApresClient, pb: &ProgressBar) -> Result<BurstResult> {
    let progress = |payload: &Value| {
        if let Some(chirp) = payload.get("chirpNumber").and_then(Value::as_u64) {
            pb.set_message(format!("Chirp {}", chirp));
        }
    };

    tokio::select! {
        result = client.radar().await_results(|_| {}, Some(progress)) => {
            Ok(result?)
        }
        _ = tokio::signal::ctrl_c() => {
            pb.abandon_with_message("Interrupted");
            bail!("Stopped waiting for results; the radar may still be bursting")
        }
    }
}

/// Run a trial burst and summarize the per-attenuator data
pub async fn trial(client: &ApresClient, ctx: &OutputContext) -> Result<()> {
    client
        .radar()
        .start_burst(BurstKind::Trial)
        .await
        .context("Failed to start trial burst")?;

    let pb = ctx.spinner("Trial burst running...");
    let result = wait_for_results(client, &pb).await?;
    pb.finish_and_clear();

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&result.to_document()),
        OutputFormat::Table => {
            if let Some(trial) = result.trial() {
                ctx.success(&format!(
                    "Trial burst finished ({} averages)",
                    trial.averages
                ));
            }
            let rows = attenuator_rows(&result.rf_attenuation, &result.af_gain, Some(&result));
            ctx.print(&rows);
        }
    }
    Ok(())
}

/// Run a full burst, optionally downloading the data file it produced
pub async fn burst(
    client: &ApresClient,
    filename: Option<&str>,
    download: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let radar = client.radar();
    match filename {
        Some(name) => radar.start_full_burst_named(name).await,
        None => radar.start_burst(BurstKind::Full).await,
    }
    .context("Failed to start burst")?;

    let pb = ctx.spinner("Burst running...");
    let result = wait_for_results(client, &pb).await?;
    pb.finish_and_clear();

    let Some(full) = result.full() else {
        bail!("Radar reported a {} result for a full burst", result.kind());
    };

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&result.to_document()),
        OutputFormat::Table => ctx.success(&format!(
            "Burst finished: {} sub-bursts written to {}",
            full.sub_bursts, full.filename
        )),
    }

    if download {
        let bytes = client.data().download(&full.filename, None).await?;
        ctx.info(&format!("Downloaded {} ({} bytes)", full.filename, bytes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_setting_forms() {
        assert!(parse_setting::<f64>(&[]).unwrap().is_none());

        match parse_setting::<f64>(&strings(&["12.5"])).unwrap() {
            Some(AttenuatorSetting::Scalar(v)) => assert_eq!(v, 12.5),
            other => panic!("expected scalar, got {:?}", other),
        }

        match parse_setting::<i32>(&strings(&["6,-4", "-14"])).unwrap() {
            Some(AttenuatorSetting::Sequence(v)) => {
                assert_eq!(v, vec![Some(6), Some(-4), Some(-14)])
            }
            other => panic!("expected sequence, got {:?}", other),
        }

        match parse_setting::<f64>(&strings(&["rfAttn2=10"])).unwrap() {
            Some(AttenuatorSetting::Sparse(map)) => assert_eq!(map.get("rfAttn2"), Some(&10.0)),
            other => panic!("expected sparse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_setting_rejects_bad_input() {
        assert!(parse_setting::<f64>(&strings(&["rfAttn1=1", "2"])).is_err());
        assert!(parse_setting::<i32>(&strings(&["loud"])).is_err());
    }

    #[test]
    fn test_to_update() {
        let args = SetConfigArgs {
            attenuators: Some(2),
            sub_bursts: None,
            averages: Some(3),
            rf_attenuation: strings(&["0,20"]),
            af_gain: Vec::new(),
            tx_antenna: Some("1, 0,0,0,0,0,0,0".into()),
            rx_antenna: None,
            user_data: None,
        };
        let update = args.to_update().unwrap();
        assert_eq!(update.attenuators, Some(2));
        assert_eq!(update.averages, Some(3));
        assert_eq!(update.tx_antenna, Some(vec![1, 0, 0, 0, 0, 0, 0, 0]));
        assert!(update.af_gain.is_none());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_attenuator_rows_without_result() {
        let rows = attenuator_rows(&[0.0, 31.0], &[-4, -14], None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].af_gain, "-14");
        assert_eq!(rows[0].histogram_bins, "-");
    }
}
