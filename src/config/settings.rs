use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pull data about Greyhound bin pickups and output it in various formats"
)]
pub struct Config {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output
    #[arg(short, long)]
    pub json: bool,

    /// CSV output
    #[arg(short, long)]
    pub csv: bool,

    /// Store state in the specified file
    #[arg(short, long)]
    pub state_file: Option<PathBuf>,

    /// Run as a daemon with a Prometheus interface
    #[arg(short, long)]
    pub daemonise: bool,

    /// The port for the daemon to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds between polls in daemon mode
    #[arg(short = 'i', long)]
    pub poll_interval: Option<u64>,

    /// Emit a metric for the first observation after startup instead of
    /// waiting for the first update
    #[arg(long)]
    pub force_init: bool,

    /// Account ID
    #[arg(short, long)]
    pub username: String,

    /// PIN
    #[arg(short, long)]
    pub password: String,
}

/// How one-shot mode prints the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Pretty,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Output formats selected by flags, JSON before CSV when both are given
    /// (human-readable unless asked otherwise)
    pub fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::new();
        if self.json {
            formats.push(OutputFormat::Json);
        }
        if self.csv {
            formats.push(OutputFormat::Csv);
        }
        if formats.is_empty() {
            formats.push(OutputFormat::Pretty);
        }
        formats
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between polls of the portal
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// State file for month totals; in-memory only when unset
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Account the first observation of each bin
    #[serde(default)]
    pub force_init: bool,

    /// Metrics server settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Bin info updates about once a week; checking daily is plenty
fn default_poll_interval() -> u64 {
    86_400
}

/// Metrics server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Port the `/metrics` endpoint listens on
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9095
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            state_file: None,
            force_init: false,
            metrics: MetricsSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("bintally/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/bintally/config.toml")),
            dirs::home_dir().map(|p| p.join(".bintally.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(poll_interval) = cli.poll_interval {
            self.poll_interval_secs = poll_interval;
        }
        if let Some(state_file) = &cli.state_file {
            self.state_file = Some(state_file.clone());
        }
        if let Some(port) = cli.port {
            self.metrics.port = port;
        }
        if cli.force_init {
            self.force_init = true;
        }
    }

    /// Validate and normalize settings values
    ///
    /// A zero interval would hammer the portal in a tight loop. Anything
    /// longer than the shortest month could skip a monthly reset.
    pub fn validate(&mut self) {
        const MIN_POLL_INTERVAL: u64 = 1;
        const MAX_POLL_INTERVAL: u64 = 28 * 86_400;

        if self.poll_interval_secs < MIN_POLL_INTERVAL {
            self.poll_interval_secs = MIN_POLL_INTERVAL;
        } else if self.poll_interval_secs > MAX_POLL_INTERVAL {
            tracing::warn!(
                "Poll interval of {}s is longer than a month, using {}s",
                self.poll_interval_secs,
                MAX_POLL_INTERVAL
            );
            self.poll_interval_secs = MAX_POLL_INTERVAL;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
