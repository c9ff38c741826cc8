//! Core traits and types for the live coaching session engine
//!
//! This crate provides the foundational types used across all other crates:
//! - The session data model (status, phases, transcript, coaching and
//!   compliance records)
//! - Audio frame and segment types
//! - Advisory channel wire types
//! - Capability traits for every external collaborator (transcription,
//!   synthesis, coaching analysis, compliance deep-check, the remote
//!   counterpart)
//! - Error types

pub mod advisory;
pub mod audio;
pub mod error;
pub mod session;
pub mod traits;

pub use advisory::{AdvisoryEvent, AdvisoryEventKind, Priority};
pub use audio::{AudioFrame, AudioSegment};
pub use error::{Error, Result};
pub use session::{
    CoachSuggestion, ComplianceViolation, HookCategory, Jurisdiction, Phase, SessionState,
    SessionStatus, Severity, Speaker, SuggestionKind, TranscriptEntry,
};
pub use traits::{
    AnalysisRequest, CoachAnalyzer, ComplianceClassifier, CounterpartEvent, CounterpartProvider,
    DeepCheckFinding, SessionToken, SpeechSynthesizer, SuggestionVerdict, TokenIssuer, Transcriber,
    VoiceSelector,
};
