//! Capability traits for external collaborators
//!
//! Every service the engine calls out to sits behind one of these traits so
//! providers can be substituted (HTTP backends in production, mocks in
//! tests) without touching the components.

mod analysis;
mod counterpart;
mod speech;

pub use analysis::{
    AnalysisRequest, CoachAnalyzer, ComplianceClassifier, DeepCheckFinding, SuggestionVerdict,
};
pub use counterpart::{CounterpartEvent, CounterpartProvider, SessionToken, TokenIssuer};
pub use speech::{SpeechSynthesizer, Transcriber, VoiceSelector};
