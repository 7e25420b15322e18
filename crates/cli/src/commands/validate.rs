//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SinkType, SourceId, StreamerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    target_fps: u32,
    enabled_sources: Vec<&'static str>,
    sink: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    target_fps: config.stream.target_fps,
                    enabled_sources: enabled_sources(&config),
                    sink: format!("{} ({:?})", config.sink.name, config.sink.sink_type),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn enabled_sources(config: &StreamerConfig) -> Vec<&'static str> {
    SourceId::ALL
        .into_iter()
        .filter(|s| config.sources.is_enabled(*s))
        .map(|s| s.as_str())
        .collect()
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &StreamerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if enabled_sources(config).is_empty() {
        warnings.push("All sources are disabled - every session will idle".to_string());
    }

    if config.stream.target_fps > 120 {
        warnings.push(format!(
            "stream.target_fps = {} exceeds the update rate of most games",
            config.stream.target_fps
        ));
    }

    if config.stream.sink_timeout() > config.stream.frame_interval() * 60 {
        warnings.push(
            "stream.sink_timeout_ms is large - a stalled sink will hold the stream for that long"
                .to_string(),
        );
    }

    if config.sink.sink_type == SinkType::File && !config.sink.params.contains_key("base_path") {
        warnings.push("File sink has no 'base_path' - writing to ./output".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Target fps: {}", summary.target_fps);
            println!("  Enabled sources: {}", summary.enabled_sources.join(", "));
            println!("  Sink: {}", summary.sink);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "does/not/exist.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_network_sink_without_addr_is_invalid() {
        let file = write_config(
            r#"
[sink]
name = "udp_out"
sink_type = "network"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_valid_config_summary() {
        let file = write_config(
            r#"
[stream]
target_fps = 30

[sources.acc]
enabled = false

[sink]
name = "recorder"
sink_type = "file"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);

        let summary = result.summary.unwrap();
        assert_eq!(summary.target_fps, 30);
        assert!(!summary.enabled_sources.contains(&"acc"));
        assert!(summary.enabled_sources.contains(&"iRacing"));

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("'base_path'")));
    }
}
