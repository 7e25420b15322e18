//! `sources` command implementation.

use anyhow::{Context, Result};
use contracts::{SourceId, StreamerConfig, Transport};
use serde::Serialize;

use crate::cli::SourcesArgs;
use crate::commands::load_config;

#[derive(Serialize)]
struct SourceInfo {
    id: &'static str,
    game: &'static str,
    transport: &'static str,
    endpoint: String,
    enabled: bool,
    stop_directive: bool,
}

/// Execute the `sources` command
pub fn run_sources(args: &SourcesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let sources = describe_sources(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&sources).context("Failed to serialize sources")?;
        println!("{}", json);
        return Ok(());
    }

    println!("\n=== Telemetry Sources ===\n");
    for s in &sources {
        println!(
            "  {:<20} {:<30} {:<13} {}{}",
            s.id,
            s.game,
            s.transport,
            s.endpoint,
            if s.enabled { "" } else { "  (disabled)" }
        );
    }
    println!();
    Ok(())
}

fn describe_sources(config: &StreamerConfig) -> Vec<SourceInfo> {
    SourceId::ALL
        .into_iter()
        .map(|source| {
            let (transport, endpoint) = match source.transport() {
                Transport::Udp => (
                    "udp",
                    config
                        .sources
                        .udp(source)
                        .map(|c| c.resolve_bind_addr(source))
                        .unwrap_or_default(),
                ),
                Transport::SharedMemory => (
                    "shared-memory",
                    config
                        .sources
                        .shared_memory(source)
                        .map(|c| c.resolve_path(source).display().to_string())
                        .unwrap_or_default(),
                ),
            };

            SourceInfo {
                id: source.as_str(),
                game: source.label(),
                transport,
                endpoint,
                enabled: config.sources.is_enabled(source),
                stop_directive: source.uses_control_channel(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_sources() {
        let sources = describe_sources(&StreamerConfig::default());
        assert_eq!(sources.len(), 6);

        let acc = sources.iter().find(|s| s.id == "acc").unwrap();
        assert_eq!(acc.transport, "shared-memory");
        assert!(acc.stop_directive);

        let dirt = sources.iter().find(|s| s.id == "dirtRally2").unwrap();
        assert_eq!(dirt.endpoint, "0.0.0.0:20777");
        assert!(!dirt.stop_directive);
        assert!(sources.iter().all(|s| s.enabled));
    }
}
