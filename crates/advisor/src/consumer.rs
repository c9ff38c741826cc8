//! Client-side advisory consumer
//!
//! Consumes the server's event stream, ignores heartbeats, applies coaching
//! events as session actions, and owns reconnection: after a channel error
//! it waits the configured delay and tries again, with at most one
//! reconnect timer pending at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;

use salescoach_core::{
    AdvisoryEvent, AdvisoryEventKind, CoachSuggestion, Error, Result, SuggestionKind,
};
use salescoach_session::{SessionAction, SessionMachine};

/// Incremental parser for the line-oriented advisory wire format: one JSON
/// object per `data:` line, other lines (keep-alive comments, blank
/// separators) ignored.
pub fn parse_sse_chunk(buffer: &mut String, chunk: &str) -> Vec<AdvisoryEvent> {
    buffer.push_str(chunk);
    let mut events = Vec::new();

    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        let line = line.trim();
        if let Some(data) = line.strip_prefix("data:") {
            match serde_json::from_str::<AdvisoryEvent>(data.trim()) {
                Ok(event) => events.push(event),
                Err(e) => tracing::debug!("skipping unparseable advisory line: {}", e),
            }
        }
    }

    events
}

/// Ensures at most one reconnect timer is pending.
#[derive(Default)]
pub struct ReconnectGuard {
    pending: AtomicBool,
}

impl ReconnectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the pending slot; false when a timer is already pending.
    pub fn try_begin(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    pub fn finish(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Consumes one session's advisory channel.
pub struct AdvisoryConsumer {
    client: reqwest::Client,
    endpoint: String,
    machine: SessionMachine,
    reconnect_delay: Duration,
    guard: Arc<ReconnectGuard>,
}

impl AdvisoryConsumer {
    pub fn new(
        endpoint: impl Into<String>,
        machine: SessionMachine,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            machine,
            reconnect_delay,
            guard: Arc::new(ReconnectGuard::new()),
        }
    }

    pub fn reconnect_guard(&self) -> Arc<ReconnectGuard> {
        self.guard.clone()
    }

    /// Apply one advisory event to the session. Heartbeats produce no state
    /// change; returns whether an action was dispatched.
    pub async fn apply_event(machine: &SessionMachine, event: &AdvisoryEvent) -> bool {
        let kind = match event.kind {
            AdvisoryEventKind::Heartbeat => return false,
            AdvisoryEventKind::Error => {
                tracing::warn!(
                    "advisory channel reported error: {}",
                    event.content.as_deref().unwrap_or("unknown")
                );
                return false;
            },
            AdvisoryEventKind::Suggestion => SuggestionKind::Suggestion,
            AdvisoryEventKind::Warning => SuggestionKind::Warning,
            AdvisoryEventKind::Praise => SuggestionKind::Praise,
        };

        let Some(content) = event.content.clone() else {
            tracing::debug!("coaching event without content, ignoring");
            return false;
        };

        let timestamp = machine.snapshot().elapsed_seconds;
        let suggestion = CoachSuggestion::new(kind, event.hook_category, content, timestamp);

        machine
            .dispatch(SessionAction::AddSuggestion { suggestion })
            .await
            .is_ok()
    }

    /// Run until shutdown: connect, consume, and on error reconnect after
    /// the configured delay.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.consume_once(&mut shutdown).await {
                Ok(()) => {
                    tracing::debug!("advisory channel closed");
                },
                Err(e) => {
                    tracing::warn!("advisory channel error: {}", e);
                },
            }

            if *shutdown.borrow() {
                break;
            }

            // Guarded: at most one reconnect timer pending at a time.
            if self.guard.try_begin() {
                tokio::select! {
                    _ = tokio::time::sleep(self.reconnect_delay) => {},
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            self.guard.finish();
                            break;
                        }
                    },
                }
                self.guard.finish();
            }
        }
    }

    async fn consume_once(&self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("advisory connect: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "advisory channel returned {}",
                response.status()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            let text = String::from_utf8_lossy(&bytes);
                            for event in parse_sse_chunk(&mut buffer, &text) {
                                Self::apply_event(&self.machine, &event).await;
                            }
                        },
                        Some(Err(e)) => {
                            return Err(Error::Transient(format!("advisory stream: {}", e)));
                        },
                        None => return Ok(()),
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescoach_core::{HookCategory, Priority, SessionState};

    fn suggestion_event(content: &str) -> AdvisoryEvent {
        AdvisoryEvent {
            kind: AdvisoryEventKind::Suggestion,
            content: Some(content.to_string()),
            hook_category: Some(HookCategory::Curiosity),
            priority: Some(Priority::Medium),
            timestamp: 1_700_000_000_000,
            id: Some("evt-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_heartbeats_produce_no_state_change() {
        let machine = SessionMachine::spawn(SessionState::new("s1"));

        // Three heartbeats, then a suggestion: the list goes 0 → 1.
        for _ in 0..3 {
            let changed =
                AdvisoryConsumer::apply_event(&machine, &AdvisoryEvent::heartbeat()).await;
            assert!(!changed);
        }
        machine.settled().await.unwrap();
        assert_eq!(machine.snapshot().coach_suggestions.len(), 0);

        let changed =
            AdvisoryConsumer::apply_event(&machine, &suggestion_event("ask why now")).await;
        assert!(changed);

        machine.settled().await.unwrap();
        let state = machine.snapshot();
        assert_eq!(state.coach_suggestions.len(), 1);
        assert_eq!(state.coach_suggestions[0].content, "ask why now");
        assert_eq!(
            state.coach_suggestions[0].hook_category,
            Some(HookCategory::Curiosity)
        );
    }

    #[tokio::test]
    async fn test_error_events_do_not_dispatch() {
        let machine = SessionMachine::spawn(SessionState::new("s1"));
        let changed =
            AdvisoryConsumer::apply_event(&machine, &AdvisoryEvent::error("backend down")).await;
        assert!(!changed);
    }

    #[test]
    fn test_parse_complete_lines() {
        let mut buffer = String::new();
        let chunk = "data: {\"type\":\"heartbeat\",\"timestamp\":1}\n\ndata: {\"type\":\"suggestion\",\"content\":\"probe deeper\",\"priority\":\"low\",\"timestamp\":2,\"id\":\"e1\"}\n\n";

        let events = parse_sse_chunk(&mut buffer, chunk);

        assert_eq!(events.len(), 2);
        assert!(events[0].is_heartbeat());
        assert_eq!(events[1].content.as_deref(), Some("probe deeper"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_parse_across_chunk_boundary() {
        let mut buffer = String::new();

        let events = parse_sse_chunk(&mut buffer, "data: {\"type\":\"heart");
        assert!(events.is_empty());

        let events = parse_sse_chunk(&mut buffer, "beat\",\"timestamp\":5}\n");
        assert_eq!(events.len(), 1);
        assert!(events[0].is_heartbeat());
    }

    #[test]
    fn test_parse_ignores_comments_and_garbage() {
        let mut buffer = String::new();
        let chunk = ": ping\n\ndata: not json at all\ndata: {\"type\":\"heartbeat\",\"timestamp\":5}\n";

        let events = parse_sse_chunk(&mut buffer, chunk);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reconnect_guard_single_pending() {
        let guard = ReconnectGuard::new();

        assert!(guard.try_begin());
        // A second trigger while the timer is pending is refused.
        assert!(!guard.try_begin());
        assert!(guard.is_pending());

        guard.finish();
        assert!(guard.try_begin());
    }
}
