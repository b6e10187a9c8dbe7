//! apres-sim - ApRES device simulator
//!
//! Serves the radar HTTP control API from an in-process axum router so the
//! client can be exercised without hardware. Burst timing, the rotating
//! pool of recorded data files and the housekeeping configuration file are
//! all simulated under a local folder.
//!
//! # Usage
//!
//! ```ignore
//! use apres_sim::{create_router, SimConfig, SimState};
//!
//! let state = SimState::new(SimConfig::with_local_folder("/tmp/apres"))?;
//! let router = create_router(state);
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod state;

pub use config::SimConfig;
pub use error::{ApiError, SimError};
pub use state::{BurstState, SimState};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use apres_core::paths::{self, route};

/// Create the device API router with the given simulator state
pub fn create_router(state: SimState) -> Router {
    Router::new()
        // System routes
        .route(&route(paths::SYSTEM_RESET), post(handlers::system::reset))
        .route(
            &route(paths::HOUSEKEEPING_STATUS),
            get(handlers::system::housekeeping_status),
        )
        .route(
            &route(paths::HOUSEKEEPING_CONFIG),
            get(handlers::system::get_housekeeping_config)
                .post(handlers::system::upload_housekeeping_config),
        )
        // Radar routes
        .route(
            &route(paths::RADAR_CONFIG),
            get(handlers::radar::get_config).post(handlers::radar::set_config),
        )
        .route(
            &route(paths::RADAR_TRIAL_BURST),
            post(handlers::radar::trial_burst).get(handlers::radar::burst_via_get),
        )
        .route(
            &route(paths::RADAR_BURST),
            post(handlers::radar::burst).get(handlers::radar::burst_via_get),
        )
        .route(&route(paths::RADAR_RESULTS), get(handlers::radar::results))
        // Data routes
        .route(&route(paths::DATA_DIR), get(handlers::data::dir))
        .route(&route(paths::DATA_DOWNLOAD), get(handlers::data::download))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
