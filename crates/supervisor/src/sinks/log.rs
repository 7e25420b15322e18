//! LogSink - logs a frame summary via tracing

use contracts::{ContractError, DataFrame, FrameSink};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
    frames: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, frame),
        fields(sink = %self.name, source = %frame.name)
    )]
    async fn send(&mut self, frame: &DataFrame) -> Result<(), ContractError> {
        self.frames += 1;
        info!(
            sink = %self.name,
            seq = self.frames,
            time = %frame.time,
            fields = frame.fields.len(),
            "DataFrame received"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.frames, "LogSink closed");
        Ok(())
    }
}
