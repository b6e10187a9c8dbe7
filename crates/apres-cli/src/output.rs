//! Output formatting for apres-cli (table, json)

use clap::ValueEnum;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file, falling back to table
    pub fn from_name(name: &str) -> Self {
        <Self as ValueEnum>::from_str(name, true).unwrap_or_default()
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No entries");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => self.print_json(&data),
        }
    }

    /// Print key-value pairs; JSON output uses `document` instead
    pub fn print_kv<T: Serialize>(&self, pairs: &[(&str, String)], document: &T) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => self.print_json(document),
        }
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
        );
    }

    /// Spinner for long-running device calls, hidden in quiet or JSON mode
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.quiet || self.format == OutputFormat::Json {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Render a mask as `1,0,0,0,0,0,0,0`
pub fn mask(values: &[u8]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Entry display for ls command
#[derive(Debug, Tabled, Serialize)]
pub struct EntryRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Modified")]
    pub modified: String,
}

/// Per-attenuator display for config and trial commands
#[derive(Debug, Tabled, Serialize)]
pub struct AttenuatorRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "RF attenuation (dB)")]
    pub rf_attenuation: String,
    #[tabled(rename = "AF gain (dB)")]
    pub af_gain: String,
    #[tabled(rename = "Histogram bins")]
    pub histogram_bins: String,
    #[tabled(rename = "Chirp samples")]
    pub chirp_samples: String,
}
