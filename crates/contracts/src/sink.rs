//! FrameSink trait - Supervisor output interface
//!
//! Defines the abstract interface for the downstream consumer of a session.

use crate::{ContractError, DataFrame};

/// Frame delivery trait
///
/// A sink delivers frames to the subscribed client. A failed `send` is not
/// fatal to the session; the supervisor logs it and keeps streaming.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one frame
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn send(&mut self, frame: &DataFrame) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
