//! Error types shared across the engine

use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-wide error taxonomy
///
/// Components catch and log their own recoverable failures; only the
/// variants flagged by [`Error::is_session_fatal`] are expected to reach the
/// session state machine as a status change.
#[derive(Error, Debug)]
pub enum Error {
    /// Microphone permission denied by the user. Non-retryable without
    /// user action.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No capture device available.
    #[error("audio capture device not found")]
    DeviceNotFound,

    /// Capture device disappeared mid-session.
    #[error("audio capture device lost: {0}")]
    DeviceLost(String),

    /// Payload rejected before any external call was attempted.
    #[error("{what} of {actual} exceeds limit of {limit}")]
    ResourceLimit {
        what: &'static str,
        limit: u64,
        actual: u64,
    },

    /// Remote service failure (invalid/expired token, synthesis failure).
    /// The message is preserved for display.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// Transient network failure; per-component policy decides whether to
    /// retry or ignore.
    #[error("transient error: {0}")]
    Transient(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session error: {0}")]
    Session(String),
}

impl Error {
    /// Whether this error should move the session to the `error` status.
    ///
    /// Transient and resource-limit failures are handled at the component
    /// boundary and never terminate the session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied
                | Error::DeviceNotFound
                | Error::DeviceLost(_)
                | Error::RemoteService(_)
        )
    }
}
