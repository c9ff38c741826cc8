//! Advisory channel wire types
//!
//! One JSON object per event, serialized onto the server→client stream.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{CoachSuggestion, HookCategory, SuggestionKind};

/// Event discriminator on the advisory wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryEventKind {
    Heartbeat,
    Suggestion,
    Warning,
    Praise,
    Error,
}

impl From<SuggestionKind> for AdvisoryEventKind {
    fn from(kind: SuggestionKind) -> Self {
        match kind {
            SuggestionKind::Suggestion => AdvisoryEventKind::Suggestion,
            SuggestionKind::Warning => AdvisoryEventKind::Warning,
            SuggestionKind::Praise => AdvisoryEventKind::Praise,
        }
    }
}

/// Delivery priority for non-heartbeat events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// One event on the advisory channel.
///
/// Heartbeats carry only `type` and `timestamp`; everything else carries
/// `content`, `priority`, and a unique `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryEvent {
    #[serde(rename = "type")]
    pub kind: AdvisoryEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "hookCategory", skip_serializing_if = "Option::is_none")]
    pub hook_category: Option<HookCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl AdvisoryEvent {
    pub fn heartbeat() -> Self {
        Self {
            kind: AdvisoryEventKind::Heartbeat,
            content: None,
            hook_category: None,
            priority: None,
            timestamp: Utc::now().timestamp_millis(),
            id: None,
        }
    }

    /// Build a coaching event from a suggestion record.
    pub fn from_suggestion(suggestion: &CoachSuggestion, priority: Priority) -> Self {
        Self {
            kind: suggestion.kind.into(),
            content: Some(suggestion.content.clone()),
            hook_category: suggestion.hook_category,
            priority: Some(priority),
            timestamp: Utc::now().timestamp_millis(),
            id: Some(suggestion.id.to_string()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AdvisoryEventKind::Error,
            content: Some(message.into()),
            hook_category: None,
            priority: Some(Priority::High),
            timestamp: Utc::now().timestamp_millis(),
            id: Some(Uuid::new_v4().to_string()),
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        self.kind == AdvisoryEventKind::Heartbeat
    }
}
