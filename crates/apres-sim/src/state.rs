//! Simulated device state
//!
//! All mutable device state lives in one [`DeviceState`] behind a mutex in
//! [`SimState`], which every handler receives through axum `State`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use apres_core::{BurstDetail, BurstKind, BurstResult, FullData, RadarConfig, TrialData};

use crate::config::SimConfig;
use crate::error::SimError;

/// Folder of recorded data files handed out by bursts
pub const DATA_FILES_DIR: &str = "data_files";
/// Folder receiving named full-burst files
pub const SURVEY_DIR: &str = "Survey";
/// Housekeeping configuration file name
pub const CONFIG_FILE: &str = "config.ini";

const SAMPLE_DATA_FILE: &str = "sample-apres-data.dat";
const CHIRP_SAMPLES: usize = 64;
const HISTOGRAM_BINS: usize = 16;

/// Housekeeping configuration written on first start
pub const DEFAULT_HOUSEKEEPING_CONFIG: &str = "\
[main]
Site = Default
Latitude = 0.0
Longitude = 0.0
nSubBursts = 1
nAttenuators = 1
Attenuator1 = 0
AFGain = -4
";

/// Burst state machine
#[derive(Debug, Clone, PartialEq)]
pub enum BurstState {
    Idle,
    Bursting {
        kind: BurstKind,
        started_at: Instant,
        /// Data file reported in the result, relative to the local folder
        filename: String,
    },
    Finished {
        kind: BurstKind,
        filename: String,
    },
}

impl BurstState {
    pub fn is_bursting(&self) -> bool {
        matches!(self, BurstState::Bursting { .. })
    }
}

/// Mutable device state
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub radar: RadarConfig,
    pub burst: BurstState,
    /// Pool file handed out by the last burst
    pub last_file: Option<String>,
}

impl DeviceState {
    /// Advance the rotating pool pointer and return the selected file
    pub fn next_file(&mut self, pool: &[String]) -> Option<String> {
        let next = match self
            .last_file
            .as_ref()
            .and_then(|last| pool.iter().position(|f| f == last))
        {
            Some(idx) => pool.get((idx + 1) % pool.len()),
            None => pool.first(),
        }
        .cloned();
        if next.is_some() {
            self.last_file = next.clone();
        }
        next
    }

    /// Chirps the current burst runs: per attenuator, averages for a trial
    /// burst and sub-bursts for a full one
    pub fn chirps(&self, kind: BurstKind) -> u32 {
        let per_attenuator = match kind {
            BurstKind::Trial => self.radar.averages,
            BurstKind::Full => self.radar.sub_bursts,
        };
        per_attenuator.saturating_mul(self.radar.attenuators as u32)
    }
}

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct SimState {
    device: Arc<Mutex<DeviceState>>,
    config: Arc<SimConfig>,
}

impl SimState {
    /// Prepare the local folder and create the initial device state
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        prepare_local_folder(&config)?;

        let device = DeviceState {
            radar: config.radar.clone(),
            burst: BurstState::Idle,
            last_file: None,
        };

        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock()
    }

    pub fn local_folder(&self) -> &Path {
        &self.config.local_folder
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.local_folder.join(CONFIG_FILE)
    }

    /// Time a burst of `chirps` chirps takes, saturating at [`Duration::MAX`]
    pub fn burst_duration(&self, chirps: u32) -> Duration {
        Duration::try_from_secs_f64(self.config.seconds_per_chirp * f64::from(chirps))
            .unwrap_or(Duration::MAX)
    }

    /// Data files available to bursts, ordered by their embedded numbers
    pub async fn data_pool(&self) -> std::io::Result<Vec<String>> {
        let dir = self.config.local_folder.join(DATA_FILES_DIR);
        let mut files = Vec::new();
        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort_by(|a, b| digit_key(a).cmp(&digit_key(b)).then_with(|| a.cmp(b)));
        Ok(files)
    }

    /// Build the result of a finished burst from the current configuration
    pub fn burst_result(&self, device: &DeviceState, kind: BurstKind, filename: &str) -> BurstResult {
        let radar = &device.radar;
        let detail = match kind {
            BurstKind::Trial => {
                let chirp: Vec<Vec<f64>> = (0..radar.attenuators)
                    .map(|i| synthetic_chirp(radar.rf_attenuation[i], radar.af_gain[i]))
                    .collect();
                let histogram = chirp.iter().map(|row| histogram(row)).collect();
                BurstDetail::Trial(TrialData {
                    averages: radar.averages,
                    histogram,
                    chirp,
                })
            }
            BurstKind::Full => BurstDetail::Full(FullData {
                sub_bursts: radar.sub_bursts,
                filename: filename.to_string(),
            }),
        };

        BurstResult {
            attenuators: radar.attenuators,
            rf_attenuation: radar.rf_attenuation.clone(),
            af_gain: radar.af_gain.clone(),
            start_frequency: Some(self.config.sweep.start_frequency),
            stop_frequency: Some(self.config.sweep.stop_frequency),
            period: Some(self.config.sweep.period),
            detail,
        }
    }
}

fn prepare_local_folder(config: &SimConfig) -> Result<(), SimError> {
    let root = &config.local_folder;
    std::fs::create_dir_all(root)?;

    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_HOUSEKEEPING_CONFIG)?;
    }

    let data_dir = root.join(DATA_FILES_DIR);
    std::fs::create_dir_all(&data_dir)?;
    if config.seed_sample_data && std::fs::read_dir(&data_dir)?.next().is_none() {
        tracing::info!(path = %data_dir.display(), "Seeding sample data file");
        std::fs::write(data_dir.join(SAMPLE_DATA_FILE), sample_data())?;
    }
    std::fs::create_dir_all(root.join(SURVEY_DIR))?;
    Ok(())
}

/// Numbers embedded in a file name, in order: `DATA2021-05-18.DAT` -> [2021, 5, 18]
fn digit_key(name: &str) -> Vec<u64> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap_or(u64::MAX))
        .collect()
}

/// Deramped chirp with a single reflector, scaled by the receive gain chain
fn synthetic_chirp(rf_attenuation: f64, af_gain: i32) -> Vec<f64> {
    let amplitude = 10f64.powf((f64::from(af_gain) - rf_attenuation) / 20.0);
    (0..CHIRP_SAMPLES)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * 5.0 * i as f64 / CHIRP_SAMPLES as f64;
            amplitude * phase.sin()
        })
        .collect()
}

/// Sample counts over [-1, 1] in equal bins
fn histogram(samples: &[f64]) -> Vec<f64> {
    let mut bins = vec![0.0; HISTOGRAM_BINS];
    for sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) + 1.0) / 2.0 * HISTOGRAM_BINS as f64;
        let bin = (scaled as usize).min(HISTOGRAM_BINS - 1);
        bins[bin] += 1.0;
    }
    bins
}

fn sample_data() -> Vec<u8> {
    let mut data = b"*** Burst Header ***\r\nNSubBursts=1\r\nNAttenuators=1\r\n*** End Header ***\r\n"
        .to_vec();
    data.extend(synthetic_chirp(0.0, -4).iter().map(|s| (s * 127.0 + 128.0) as u8));
    data
}
