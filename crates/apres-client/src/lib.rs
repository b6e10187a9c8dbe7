//! ApRES Client Library
//!
//! Typed client for the HTTP control API of an ApRES ground-penetrating
//! radar: system reset and housekeeping, radar chirp configuration,
//! trial/full bursts with results polling, and data file access.
//!
//! # Example
//!
//! ```rust,no_run
//! use apres_client::{ApresClient, ConfigUpdate};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApresClient::new("http://radar.localnet")?;
//!     client.set_api_key("18052021")?;
//!
//!     // Three attenuator settings, second one changed
//!     client
//!         .radar_config()
//!         .set(ConfigUpdate::new().attenuators(3).rf_attenuation(vec![0.0, 10.0, 20.0]))
//!         .await?;
//!
//!     // Trial burst, printing progress
//!     let result = client
//!         .radar()
//!         .trial_burst(Some(|p: &serde_json::Value| println!("{}", p)))
//!         .await?;
//!     println!("{} histogram rows", result.trial().map(|t| t.histogram.len()).unwrap_or(0));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module runs a router on a loopback port:
//!
//! ```rust,ignore
//! use apres_client::testing::TestServer;
//!
//! let server = TestServer::start(apres_sim::create_router(state)).await?;
//! let config = server.client.radar_config().get().await?;
//! ```

mod burst;
mod client;
mod data;
mod document;
mod error;
mod radar_config;
mod results;
mod settings;
mod system;
pub mod testing;
mod transport;
mod validate;

pub use burst::{BurstController, ResultsHandle};
pub use client::ApresClient;
pub use data::DataResource;
pub use error::{ApresError, Result};
pub use radar_config::{AttenuatorSetting, ConfigUpdate, RadarConfigResource};
pub use results::{parse_finished, parse_results, BurstStatus};
pub use settings::{ClientSettings, ClientSettingsBuilder, TimeoutsConfig, DEFAULT_API_KEY};
pub use system::{SystemResource, HOUSEKEEPING_CONFIG_FILE};
pub use transport::{normalize_root, DeviceResponse};

// Re-export core types for convenience
pub use apres_core::{
    format_timestamp, BurstDetail, BurstKind, BurstResult, DirectoryListing, FullData,
    HousekeepingStatus, RadarConfig, ResetMessage, TrialData,
};
