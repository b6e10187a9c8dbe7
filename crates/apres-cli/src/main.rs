//! ApRES CLI - Command-line tool for ApRES radar control
//!
//! Drives the radar's HTTP API: housekeeping, chirp configuration,
//! trial and full bursts, and data file transfer.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use apres_client::{ApresClient, ClientSettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::SetConfigArgs;
use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "apres-cli")]
#[command(author, version, about = "ApRES Radar Control CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Radar root URL [default: http://localhost:8000]
    #[arg(short, long, env = "APRES_SERVER")]
    server: Option<String>,

    /// API key for commands that change radar state
    #[arg(short = 'k', long, env = "APRES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "APRES_CONFIG")]
    config: Option<PathBuf>,

    /// Output format [default: table]
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show battery, clock and GPS status
    Status,

    /// Reset the radar
    Reset,

    /// Show the chirp configuration
    Config,

    /// Change the chirp configuration
    SetConfig(SetConfigArgs),

    /// Run a trial burst and show its summary
    Trial,

    /// Run a full burst
    Burst {
        /// Save the data under Survey/ with this name
        #[arg(long)]
        filename: Option<String>,

        /// Download the data file when the burst finishes
        #[arg(long)]
        download: bool,
    },

    /// List files on the radar
    Ls {
        /// Directory relative to the data root
        path: Option<String>,

        /// First entry to list
        #[arg(long)]
        index: Option<usize>,
    },

    /// Download a file from the radar
    Download {
        /// Remote path, e.g. Survey/site-a.dat
        remote: String,

        /// Local path [default: remote file name]
        local: Option<PathBuf>,
    },

    /// Housekeeping configuration file
    #[command(subcommand)]
    HkConfig(HkConfigCommand),
}

#[derive(Subcommand)]
enum HkConfigCommand {
    /// Print the file
    Show,

    /// Save the file locally
    Download {
        /// Local path [default: config.ini]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Replace the file on the radar
    Upload {
        /// File to upload
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let output_name = cli.output.map(|f| match f {
        OutputFormat::Table => "table",
        OutputFormat::Json => "json",
    });
    let merged = config.merge_with_args(
        cli.server.as_deref(),
        cli.api_key.as_deref(),
        output_name,
        cli.no_color,
    );

    let format = OutputFormat::from_name(&merged.output);
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);
    let client = create_client(&merged)?;

    match &cli.command {
        Commands::Status => commands::status(&client, &ctx).await?,
        Commands::Reset => commands::reset(&client, &ctx).await?,
        Commands::Config => commands::config(&client, &ctx).await?,
        Commands::SetConfig(args) => commands::set_config(&client, args, &ctx).await?,
        Commands::Trial => commands::trial(&client, &ctx).await?,
        Commands::Burst { filename, download } => {
            commands::burst(&client, filename.as_deref(), *download, &ctx).await?
        }
        Commands::Ls { path, index } => {
            commands::ls(&client, path.as_deref(), *index, &ctx).await?
        }
        Commands::Download { remote, local } => {
            commands::download(&client, remote, local.as_deref(), &ctx).await?
        }
        Commands::HkConfig(HkConfigCommand::Show) => commands::show_hk_config(&client).await?,
        Commands::HkConfig(HkConfigCommand::Download { path, force }) => {
            commands::download_hk_config(&client, path.as_deref(), *force, &ctx).await?
        }
        Commands::HkConfig(HkConfigCommand::Upload { file }) => {
            commands::upload_hk_config(&client, file, &ctx).await?
        }
    }

    Ok(())
}

/// Create an ApRES client from the merged configuration
fn create_client(merged: &MergedConfig) -> Result<ApresClient> {
    let mut settings = ClientSettings::new(merged.server.as_str());
    if let Some(key) = &merged.api_key {
        settings.api_key = key.clone();
    }
    settings.timeouts = merged.timeouts.clone();
    ApresClient::with_settings(settings).context("Failed to create ApRES client")
}
