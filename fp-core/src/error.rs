//! Playback error types

use thiserror::Error;

/// Errors surfaced by the route playback engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Polyline too short, non-finite coordinates, empty vehicle id or zero duration.
    /// Raised synchronously; no session is created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `cancel` was called while no session was running
    #[error("no playback session is running")]
    NotRunning,

    /// A position report could not be delivered to a sink.
    /// Logged by the dispatcher, never surfaced to playback state.
    #[error("position report delivery failed: {0}")]
    ReportDelivery(String),
}

impl PlaybackError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
