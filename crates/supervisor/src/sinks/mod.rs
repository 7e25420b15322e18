//! Sink implementations
//!
//! Contains LogSink, FileSink, and NetworkSink, plus the config-driven
//! factory used by the CLI.

mod file;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};

use contracts::{ContractError, DataFrame, FrameSink, SinkConfig, SinkType};
use tracing::info;

use crate::error::SupervisorError;

/// Any of the built-in sinks
pub enum AnySink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
}

impl FrameSink for AnySink {
    fn name(&self) -> &str {
        match self {
            Self::Log(s) => s.name(),
            Self::File(s) => s.name(),
            Self::Network(s) => s.name(),
        }
    }

    async fn send(&mut self, frame: &DataFrame) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.send(frame).await,
            Self::File(s) => s.send(frame).await,
            Self::Network(s) => s.send(frame).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.flush().await,
            Self::File(s) => s.flush().await,
            Self::Network(s) => s.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.close().await,
            Self::File(s) => s.close().await,
            Self::Network(s) => s.close().await,
        }
    }
}

/// Build the sink described by `config`
pub async fn create_sink(config: &SinkConfig) -> Result<AnySink, SupervisorError> {
    let sink = match config.sink_type {
        SinkType::Log => AnySink::Log(LogSink::new(&config.name)),
        SinkType::File => AnySink::File(
            FileSink::from_params(&config.name, &config.params)
                .map_err(|e| SupervisorError::sink_creation(&config.name, e.to_string()))?,
        ),
        SinkType::Network => AnySink::Network(
            NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| SupervisorError::sink_creation(&config.name, e.to_string()))?,
        ),
    };

    info!(sink = %config.name, sink_type = ?config.sink_type, "sink created");
    Ok(sink)
}
