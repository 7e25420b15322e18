//! # Simracing Streamer CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 单会话遥测流的启动与监管
//! - 优雅关闭处理 (Ctrl+C / SIGTERM)

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_sources, run_stream, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Simracing Streamer CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_stream(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Sources(args) => run_sources(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// Prometheus is started later by `run`, only when a port is given.
fn init_logging(cli: &Cli) -> Result<()> {
    let log_format = match cli.log_format {
        cli::LogFormat::Json => observability::LogFormat::Json,
        cli::LogFormat::Pretty => observability::LogFormat::Pretty,
        cli::LogFormat::Compact => observability::LogFormat::Compact,
    };

    let config = observability::ObservabilityConfig::new(log_format)
        .with_verbosity(cli.verbose, cli.quiet);
    observability::init_with_config(&config)
}
