//! ApRES device simulator
//!
//! Serves the radar HTTP control API for client development and tests.
//!
//! # Usage
//!
//! ```bash
//! ./apres-sim --local-folder /tmp/apres --seconds-per-chirp 0.1
//! ```
//!
//! With config file:
//! ```bash
//! ./apres-sim --config config/apres-sim.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apres_sim::{create_router, SimConfig, SimState};

#[derive(Parser, Debug)]
#[command(name = "apres-sim")]
#[command(about = "ApRES radar simulator serving the HTTP control API")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// API key required on POST requests (overrides config)
    #[arg(long, env = "APRES_API_KEY")]
    api_key: Option<String>,

    /// Folder holding config.ini and data files (overrides config)
    #[arg(long)]
    local_folder: Option<PathBuf>,

    /// Simulated seconds per chirp (overrides config)
    #[arg(long)]
    seconds_per_chirp: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "apres_sim=debug,tower_http=debug"
    } else {
        "apres_sim=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            SimConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    if let Some(folder) = args.local_folder {
        config.local_folder = folder;
    }
    if let Some(seconds) = args.seconds_per_chirp {
        config.seconds_per_chirp = seconds;
    }

    let listen = config.listen.clone();
    info!(
        local_folder = %config.local_folder.display(),
        seconds_per_chirp = config.seconds_per_chirp,
        "Starting ApRES simulator"
    );

    let state = SimState::new(config).context("Failed to prepare simulator state")?;
    let pool = state.data_pool().await.context("Failed to list data files")?;
    info!("Found {} files in data_files", pool.len());

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // Wait for Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
