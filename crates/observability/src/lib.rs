//! # Observability
//!
//! 遥测流的日志与指标。
//!
//! - `tracing` 订阅器：json / pretty / compact，`RUST_LOG` 优先于命令行级别
//! - Prometheus 导出器：只在给出非零端口时启动
//! - `metrics` 模块：会话与帧计数、sink 延迟统计
//!
//! ```ignore
//! let config = observability::ObservabilityConfig::new(LogFormat::Compact)
//!     .with_verbosity(1, false)
//!     .with_metrics_port(9100);
//! observability::init_with_config(&config)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_conversion_failure, record_frame_forwarded, record_frame_received,
    record_frame_throttled, record_producer_error, record_session_ended, record_session_started,
    record_sink_latency_ms, RunningStats, StatsSummary,
};

/// Log and metrics settings of one streamer process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Level used when `RUST_LOG` is unset
    pub default_log_level: &'static str,
    /// Prometheus listener port, `None` keeps the exporter off
    pub metrics_port: Option<u16>,
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl ObservabilityConfig {
    /// Logging at `info`, no exporter
    pub fn new(log_format: LogFormat) -> Self {
        Self {
            log_format,
            default_log_level: "info",
            metrics_port: None,
        }
    }

    /// Map `-v` repetitions and `-q` to a level. `quiet` wins.
    pub fn with_verbosity(mut self, verbose: u8, quiet: bool) -> Self {
        self.default_log_level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        self
    }

    /// Port 0 disables the exporter.
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = (port != 0).then_some(port);
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(self.default_log_level)))
    }
}

/// Default directive: the chosen level for our crates, exporter internals kept at warn.
fn filter_directive(level: &str) -> String {
    format!("{level},metrics_exporter_prometheus=warn,hyper=warn")
}

/// Install the global subscriber, then the exporter when a port is set.
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(config.env_filter())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        start_metrics_exporter(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = config.default_log_level,
        "logging initialized"
    );
    Ok(())
}

/// Start the Prometheus exporter on `0.0.0.0:port`
///
/// Used on its own when the subscriber is already installed.
pub fn start_metrics_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let base = ObservabilityConfig::new(LogFormat::Compact);
        assert_eq!(base.default_log_level, "info");
        assert_eq!(base.clone().with_verbosity(1, false).default_log_level, "debug");
        assert_eq!(base.clone().with_verbosity(3, false).default_log_level, "trace");
        assert_eq!(base.with_verbosity(2, true).default_log_level, "warn");
    }

    #[test]
    fn test_zero_port_disables_exporter() {
        let config = ObservabilityConfig::new(LogFormat::Json);
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.clone().with_metrics_port(0).metrics_port, None);
        assert_eq!(config.with_metrics_port(9100).metrics_port, Some(9100));
    }

    #[test]
    fn test_filter_directive_parses() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("debug,"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
