//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Simracing Streamer - live telemetry stream supervisor for racing simulators
#[derive(Parser, Debug)]
#[command(
    name = "simracing-streamer",
    author,
    version,
    about = "Live telemetry stream supervisor for racing simulators",
    long_about = "Subscribes to one racing-simulator telemetry source, forwards its frames \n\
                  to the configured sink at a fixed rate, and shuts the source down \n\
                  cleanly on Ctrl+C or SIGTERM."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SIMRACING_STREAMER_VERBOSE")]
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
        env = "SIMRACING_STREAMER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream one telemetry source until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// List supported telemetry sources
    Sources(SourcesArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Source identifier, e.g. `acc`, `iRacing`, `dirtRally2`
    pub source: String,

    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SIMRACING_STREAMER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the outbound frame rate from configuration
    #[arg(long, env = "SIMRACING_STREAMER_TARGET_FPS")]
    pub target_fps: Option<u32>,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "SIMRACING_STREAMER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without streaming
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "SIMRACING_STREAMER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `sources` command
#[derive(Parser, Debug)]
pub struct SourcesArgs {
    /// Configuration file used to resolve endpoints and enablement
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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
