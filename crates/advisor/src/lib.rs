//! Streaming coaching advisor
//!
//! The server side runs a per-channel loop: an immediate heartbeat, then on
//! a fixed cadence it samples the session transcript and phase, asks the
//! analysis service whether a coaching tip is warranted, and pushes at most
//! one event per cycle. The client side consumes the channel, applies
//! suggestion events as session actions, and owns reconnection.

pub mod consumer;
pub mod coach;
pub mod sent;

pub use coach::{AdvisoryHandle, AdvisoryLoop};
pub use consumer::{parse_sse_chunk, AdvisoryConsumer, ReconnectGuard};
pub use sent::SentSuggestions;
