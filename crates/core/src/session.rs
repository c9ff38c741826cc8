//! Session data model: status, phases, transcript, coaching and compliance
//! records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Collecting configuration before anything is live
    #[default]
    Configuring,
    /// Counterpart connection being established
    Connecting,
    /// Connected, neither side actively speaking
    Connected,
    /// Trainee microphone live, capturing
    Listening,
    /// Counterpart speaking
    Speaking,
    /// Temporarily paused by the trainee
    Paused,
    /// Cleanly finished (terminal)
    Ended,
    /// Failed terminally; message preserved on the state
    Error,
}

impl SessionStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Error)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Configuring => "configuring",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Listening => "listening",
            SessionStatus::Speaking => "speaking",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
            SessionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Conversational phases of the sales script, in fixed order.
///
/// The phase index only moves forward during a session; an explicit external
/// override is the one sanctioned way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building rapport with the counterpart
    #[default]
    Rapport,
    /// Surfacing budget and financial context
    MoneyQuestions,
    /// Probing underlying motivation
    DeepQuestions,
    /// Framing the offer
    Frame,
    /// Asking for the commitment
    Close,
}

impl Phase {
    /// All phases in script order.
    pub const ALL: [Phase; 5] = [
        Phase::Rapport,
        Phase::MoneyQuestions,
        Phase::DeepQuestions,
        Phase::Frame,
        Phase::Close,
    ];

    /// Position in the fixed script order.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Phase> {
        Self::ALL.get(index).copied()
    }

    /// The next phase in script order, if any.
    pub fn next(&self) -> Option<Phase> {
        Self::from_index(self.index() + 1)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Rapport => "rapport",
            Phase::MoneyQuestions => "money_questions",
            Phase::DeepQuestions => "deep_questions",
            Phase::Frame => "frame",
            Phase::Close => "close",
        };
        write!(f, "{}", s)
    }
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Trainee,
    Counterpart,
}

/// One utterance in the session transcript. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: String,
    /// Seconds since session start
    pub timestamp: f64,
    /// Phase active when the utterance was produced
    pub phase: Phase,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, content: impl Into<String>, timestamp: f64, phase: Phase) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            content: content.into(),
            timestamp,
            phase,
        }
    }
}

/// Kind of coaching feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Suggestion,
    Warning,
    Praise,
}

/// Psychological framing label attached to a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookCategory {
    Fear,
    Shame,
    Curiosity,
    Authority,
    Drama,
}

/// A coaching suggestion pushed during the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachSuggestion {
    pub id: Uuid,
    pub kind: SuggestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_category: Option<HookCategory>,
    pub content: String,
    /// Seconds since session start
    pub timestamp: f64,
    /// The one mutable field: set when the trainee dismisses the card
    pub dismissed: bool,
}

impl CoachSuggestion {
    pub fn new(
        kind: SuggestionKind,
        hook_category: Option<HookCategory>,
        content: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            hook_category,
            content: content.into(),
            timestamp,
            dismissed: false,
        }
    }
}

/// Violation severity. Determines default UI lifetime, not detector
/// behavior: critical cards persist until dismissed, the rest auto-expire
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Jurisdiction mode selecting which tier-1 trigger table applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    #[default]
    Standard,
    Strict,
}

/// A detected compliance violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub id: Uuid,
    pub severity: Severity,
    /// Rule category, e.g. "disclosure_skipping"
    pub category: String,
    pub message: String,
    /// Corrective phrasing offered to the trainee
    pub suggestion: String,
    /// Back-reference into the transcript, not ownership
    pub transcript_index: usize,
    /// Seconds since session start
    pub timestamp: f64,
}

impl ComplianceViolation {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        transcript_index: usize,
        timestamp: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            category: category.into(),
            message: message.into(),
            suggestion: suggestion.into(),
            transcript_index,
            timestamp,
        }
    }
}

/// The single source of truth for one live session.
///
/// Mutated only through the session crate's reducer; no other component
/// holds a writable reference to these collections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    pub current_phase: Phase,
    /// Append-only during a session; timestamps are non-decreasing
    pub transcript: Vec<TranscriptEntry>,
    pub coach_suggestions: Vec<CoachSuggestion>,
    pub compliance_violations: Vec<ComplianceViolation>,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Elapsed seconds at the trainee's most recent utterance, for
    /// idle detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trainee_speech_secs: Option<f64>,
    /// Seconds the counterpart has been speaking uninterrupted; reset by
    /// any trainee utterance
    pub counterpart_speaking_secs: f64,
    /// Message preserved when status is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// The last `n` transcript entries, oldest first.
    pub fn recent_transcript(&self, n: usize) -> &[TranscriptEntry] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering() {
        assert_eq!(Phase::Rapport.index(), 0);
        assert_eq!(Phase::Close.index(), 4);
        assert_eq!(Phase::Rapport.next(), Some(Phase::MoneyQuestions));
        assert_eq!(Phase::Close.next(), None);
        assert_eq!(Phase::from_index(2), Some(Phase::DeepQuestions));
        assert_eq!(Phase::from_index(9), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(SessionStatus::Ended.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_recent_transcript() {
        let mut state = SessionState::new("s1");
        for i in 0..10 {
            state.transcript.push(TranscriptEntry::new(
                Speaker::Trainee,
                format!("entry {}", i),
                i as f64,
                Phase::Rapport,
            ));
        }
        let recent = state.recent_transcript(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "entry 4");

        assert_eq!(state.recent_transcript(20).len(), 10);
    }
}
