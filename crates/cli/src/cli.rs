//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Feature Engine - dual-tree acquisition runner for light-sheet microscopes
#[derive(Parser, Debug)]
#[command(
    name = "feature-engine",
    author,
    version,
    about = "Light-sheet acquisition feature engine",
    long_about = "Runs an acquisition plan as two synchronized feature trees.\n\n\
                  The signal tree drives the hardware one camera frame at a time, \n\
                  the data tree processes each delivered frame."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FEATURE_ENGINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FEATURE_ENGINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an acquisition plan against the synthetic microscope
    Run(RunArgs),

    /// Validate a plan file without running it
    Validate(ValidateArgs),

    /// Display plan information and the resolved feature tree
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to plan file (TOML or JSON)
    #[arg(short, long, default_value = "plan.toml", env = "FEATURE_ENGINE_PLAN")]
    pub plan: PathBuf,

    /// Run in live mode regardless of the plan setting
    #[arg(long)]
    pub live: bool,

    /// Number of passes in live mode (0 = until stopped)
    #[arg(long, env = "FEATURE_ENGINE_CYCLES")]
    pub cycles: Option<u32>,

    /// Simulated camera exposure per frame in milliseconds
    #[arg(long, default_value = "0", env = "FEATURE_ENGINE_EXPOSURE_MS")]
    pub exposure_ms: u64,

    /// Stop the acquisition after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FEATURE_ENGINE_TIMEOUT")]
    pub timeout: u64,

    /// Resolve the plan and exit without acquiring
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FEATURE_ENGINE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to plan file to validate
    #[arg(short, long, default_value = "plan.toml")]
    pub plan: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to plan file
    #[arg(short, long, default_value = "plan.toml")]
    pub plan: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show experiment parameters
    #[arg(long)]
    pub experiment: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
