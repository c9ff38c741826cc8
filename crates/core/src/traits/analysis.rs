//! Text analysis interfaces: coaching verdicts and compliance deep-checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::advisory::Priority;
use crate::error::Result;
use crate::session::{HookCategory, Jurisdiction, Phase, Severity, SuggestionKind, TranscriptEntry};

/// Input to one coaching analysis cycle
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    /// Recent transcript excerpt, oldest first
    pub excerpt: Vec<TranscriptEntry>,
    /// Phase active at analysis time
    pub phase: Phase,
    /// Suggestion texts already delivered this session, so the service can
    /// avoid repeating itself
    pub already_sent: Vec<String>,
}

/// A warranted coaching suggestion returned by the analysis service
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionVerdict {
    pub kind: SuggestionKind,
    #[serde(default)]
    pub hook_category: Option<HookCategory>,
    #[serde(default)]
    pub priority: Priority,
    pub content: String,
    /// Whether the analysis thinks the conversation is ready for the next
    /// phase
    #[serde(default)]
    pub advance_phase: bool,
}

/// Coaching analysis interface.
///
/// Returns `None` when no suggestion is warranted this cycle; that is the
/// common case and not an error.
#[async_trait]
pub trait CoachAnalyzer: Send + Sync + 'static {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Option<SuggestionVerdict>>;

    /// Service name for logging
    fn service_name(&self) -> &str;
}

/// One violation reported by the deep-check service
#[derive(Debug, Clone, Deserialize)]
pub struct DeepCheckFinding {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub suggestion: String,
}

/// Tier-2 compliance classification interface.
///
/// Only consulted when the local trigger tables found nothing; failures are
/// swallowed by the detector since tier 1 is the safety net.
#[async_trait]
pub trait ComplianceClassifier: Send + Sync + 'static {
    async fn classify(
        &self,
        utterance: &str,
        jurisdiction: Jurisdiction,
    ) -> Result<Vec<DeepCheckFinding>>;

    /// Service name for logging
    fn service_name(&self) -> &str;
}
