//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Frames carry a wall-clock capture time (`chrono::DateTime<Utc>`)
//! - Throttling uses the monotonic clock of the supervisor, not frame time

mod config;
mod control;
mod data_frame;
mod error;
mod sink;
mod source_id;
mod telemetry;

pub use config::*;
pub use control::{ControlDirective, PublishStatus, SessionState};
pub use data_frame::{DataFrame, Field, FieldValue};
pub use error::*;
pub use sink::{FrameSink, LocalFrameSink};
pub use source_id::{SourceId, Transport, UnknownSource};
pub use telemetry::*;
