//! Compliance violation detection
//!
//! Every trainee utterance is screened in two tiers: a fast local
//! trigger-phrase match, and an optional external deep-check consulted only
//! when the local tables stay silent. The detector only produces
//! violations; dismissal and lifetime are session concerns.

pub mod detector;
pub mod rules;

pub use detector::ViolationDetector;
pub use rules::{critical_rules, jurisdiction_rules, TriggerRule};
