//! Session lifecycle and control-channel vocabulary.

use serde::{Deserialize, Serialize};

/// Directive sent to producers that own a polled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDirective {
    /// Release the resource and exit
    Stop,
}

/// Per-session state machine
///
/// `Idle -> Streaming -> Stopping -> Terminated`; nothing leaves `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Streaming,
    Stopping,
    Terminated,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Streaming)
                | (SessionState::Streaming, SessionState::Stopping)
                | (SessionState::Stopping, SessionState::Terminated)
        )
    }
}

/// Outcome of a client-to-stream publish
///
/// The stream is output-only, so denial is the only outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    PermissionDenied,
}
