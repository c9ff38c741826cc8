//! Remote counterpart transport
//!
//! A thin orchestration state machine layered over the
//! [`salescoach_core::CounterpartProvider`] capability: token exchange,
//! lifecycle ordering, interrupt, and best-effort teardown. Exactly one
//! connection is live per session.

pub mod counterpart;

pub use counterpart::{ConnectionState, CounterpartController};

use thiserror::Error;

/// Transport errors. These are reported to the session layer as status
/// changes; they never cross component boundaries as panics or uncaught
/// failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{operation} requires a live connection (state: {state})")]
    NotConnected {
        operation: &'static str,
        state: String,
    },

    #[error("remote call failed: {0}")]
    Remote(String),
}
