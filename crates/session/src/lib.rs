//! Session state machine
//!
//! The session lifecycle is a plain state-transition function: given the
//! same state and action, [`reduce`] returns the same next state and nothing
//! else happens. That purity is what makes the rest of the engine testable
//! in isolation: any host (server, test harness, headless runner) can
//! drive it. [`SessionMachine`] wraps the reducer with an action queue that
//! applies actions strictly one at a time.

pub mod machine;
pub mod state;

pub use machine::SessionMachine;
pub use state::{reduce, SessionAction};

use thiserror::Error;

/// Session machine errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session machine closed")]
    Closed,
}
