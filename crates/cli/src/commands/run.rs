//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{SourceId, StreamerConfig};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::load_config;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_stream(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(fps) = args.target_fps {
        if fps == 0 {
            return Err(CliError::config("--target-fps must be at least 1").into());
        }
        info!(target_fps = fps, "Overriding target fps from CLI");
        config.stream.target_fps = fps;
    }

    let source = SourceId::parse(&args.source);
    match source {
        Some(source) if !config.sources.is_enabled(source) => {
            warn!(source = %source, "Source is disabled in configuration, no frames will arrive");
        }
        Some(source) => info!(source = %source, game = source.label(), "Source selected"),
        None => warn!(identifier = %args.source, "Unknown source, no frames will arrive"),
    }

    info!(
        target_fps = config.stream.target_fps,
        sink = %config.sink.name,
        sink_type = ?config.sink.sink_type,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, &args.source, source);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::start_metrics_exporter(args.metrics_port)?;
    }

    let sink = supervisor::create_sink(&config.sink)
        .await
        .context("Failed to create sink")?;

    let session = supervisor::subscribe(&args.source, sink, &config)
        .map_err(|e| CliError::session(e.to_string()))?;

    let deadline = async {
        if args.timeout == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await;
        }
    };

    info!(session_id = session.id(), "Streaming...");

    tokio::select! {
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping session...");
        }
        _ = deadline => {
            info!(timeout_secs = args.timeout, "Timeout reached, stopping session...");
        }
        _ = session.terminated() => {
            warn!("Session terminated on its own");
        }
    }

    let report = session
        .shutdown()
        .await
        .map_err(|e| CliError::session(e.to_string()))?;

    println!("\n{report}\n");
    info!("Simracing Streamer finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &StreamerConfig, identifier: &str, source: Option<SourceId>) {
    println!("\n=== Configuration Summary ===\n");
    match source {
        Some(source) => {
            println!("Source: {} ({})", source, source.label());
            if let Some(udp) = config.sources.udp(source) {
                println!("  Listen: {}", udp.resolve_bind_addr(source));
            }
            if let Some(shm) = config.sources.shared_memory(source) {
                println!("  Page: {}", shm.resolve_path(source).display());
                println!("  Poll interval: {:?}", shm.poll_interval());
            }
            println!("  Enabled: {}", config.sources.is_enabled(source));
        }
        None => println!("Source: {identifier} (unknown)"),
    }

    println!("\nStream:");
    println!("  Target fps: {}", config.stream.target_fps);
    println!("  Frame interval: {:?}", config.stream.frame_interval());
    println!("  Sink timeout: {:?}", config.stream.sink_timeout());
    println!("  Shutdown timeout: {:?}", config.stream.shutdown_timeout());

    println!("\nSink: {} ({:?})", config.sink.name, config.sink.sink_type);
    for (key, value) in &config.sink.params {
        println!("  {key} = {value}");
    }
    println!();
}
