//! Remote counterpart capability interface
//!
//! The avatar/voice-synthesis provider is driven through this contract so
//! any remote vendor can be substituted behind the same connection
//! controller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::Result;

/// Short-lived credential exchanged for a live counterpart connection
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Issues connection tokens (validity ≈10 minutes).
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    async fn issue(&self) -> Result<SessionToken>;
}

/// Connection and speaking-state changes pushed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterpartEvent {
    Connected,
    SpeakingStarted,
    SpeakingEnded,
    ListeningStarted,
    ListeningStopped,
    /// In-flight speech was cancelled
    Interrupted,
    Disconnected,
    Error(String),
}

/// The remote counterpart capability.
///
/// Exactly one connection is live per session; the connection controller
/// enforces that and owns all lifecycle ordering. Providers report state
/// changes on the broadcast stream rather than via callbacks.
#[async_trait]
pub trait CounterpartProvider: Send + Sync + 'static {
    /// Establish the connection using an issued token.
    async fn connect(&self, token: &SessionToken) -> Result<()>;

    /// Have the counterpart speak the given text.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Start routing trainee audio to the counterpart.
    async fn start_listening(&self) -> Result<()>;

    /// Stop routing trainee audio.
    async fn stop_listening(&self) -> Result<()>;

    /// Cancel in-flight counterpart speech immediately (trainee barge-in).
    async fn interrupt(&self) -> Result<()>;

    /// Tear down the remote connection.
    async fn disconnect(&self) -> Result<()>;

    /// Subscribe to connection/speaking-state events.
    fn subscribe(&self) -> broadcast::Receiver<CounterpartEvent>;
}
