//! Server-side advisory loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use salescoach_config::constants::advisory::CHANNEL_CAPACITY;
use salescoach_config::AdvisorySettings;
use salescoach_core::{
    AdvisoryEvent, AnalysisRequest, CoachAnalyzer, CoachSuggestion, Result, SessionState,
};
use salescoach_session::{SessionAction, SessionMachine};

use crate::sent::SentSuggestions;

/// One advisory loop, bound to one session machine and one analysis
/// backend.
pub struct AdvisoryLoop {
    machine: SessionMachine,
    analyzer: Arc<dyn CoachAnalyzer>,
    sent: Arc<Mutex<SentSuggestions>>,
    settings: AdvisorySettings,
    events: broadcast::Sender<AdvisoryEvent>,
}

/// Handle to a running loop. Dropping the handle does not stop the loop;
/// call [`AdvisoryHandle::shutdown`]. It signals synchronously, so the
/// interval is cleared before the channel closes.
pub struct AdvisoryHandle {
    events: broadcast::Sender<AdvisoryEvent>,
    shutdown: watch::Sender<bool>,
}

impl AdvisoryHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<AdvisoryEvent> {
        self.events.subscribe()
    }

    /// Stop the loop. Synchronous: the shutdown flag is set before this
    /// returns, and the loop drops its interval before the event channel
    /// closes. No timer outlives a torn-down channel.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl AdvisoryLoop {
    pub fn new(
        machine: SessionMachine,
        analyzer: Arc<dyn CoachAnalyzer>,
        sent: Arc<Mutex<SentSuggestions>>,
        settings: AdvisorySettings,
    ) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            machine,
            analyzer,
            sent,
            settings,
            events,
        }
    }

    /// Subscribe before spawning to be certain of catching the opening
    /// heartbeat.
    pub fn subscribe(&self) -> broadcast::Receiver<AdvisoryEvent> {
        self.events.subscribe()
    }

    /// Start the loop: immediate heartbeat, then one analysis cycle per
    /// tick. A failed cycle is logged and the loop continues; a single bad
    /// cycle never terminates the channel.
    pub fn spawn(self) -> AdvisoryHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let events = self.events.clone();

        tokio::spawn(async move {
            let _ = self.events.send(AdvisoryEvent::heartbeat());

            let mut ticker =
                tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; the opening heartbeat
            // already covered it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            tracing::warn!("advisory cycle failed, continuing: {}", e);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        // A dropped sender counts as shutdown.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("advisory loop stopped");
        });

        AdvisoryHandle {
            events,
            shutdown: shutdown_tx,
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        let snapshot = self.machine.snapshot();

        // The one hard skip condition: too little content to analyze.
        if snapshot.transcript.len() < self.settings.min_transcript_entries {
            let _ = self.events.send(AdvisoryEvent::heartbeat());
            return Ok(());
        }

        let request = self.build_request(&snapshot);
        let verdict = self.analyzer.analyze(&request).await?;

        let Some(verdict) = verdict else {
            let _ = self.events.send(AdvisoryEvent::heartbeat());
            return Ok(());
        };

        // Never re-emit a text already delivered this session.
        if self.sent.lock().contains(&verdict.content) {
            tracing::debug!("suppressing repeated suggestion");
            let _ = self.events.send(AdvisoryEvent::heartbeat());
            return Ok(());
        }

        let suggestion = CoachSuggestion::new(
            verdict.kind,
            verdict.hook_category,
            verdict.content.clone(),
            snapshot.elapsed_seconds,
        );
        let event = AdvisoryEvent::from_suggestion(&suggestion, verdict.priority);

        self.machine
            .dispatch(SessionAction::AddSuggestion { suggestion })
            .await
            .map_err(|e| salescoach_core::Error::Session(e.to_string()))?;

        // The analysis drives phase advancement; the machine enforces
        // monotonicity.
        if verdict.advance_phase {
            if let Some(next) = snapshot.current_phase.next() {
                self.machine
                    .dispatch(SessionAction::AdvancePhase { to: next })
                    .await
                    .map_err(|e| salescoach_core::Error::Session(e.to_string()))?;
            }
        }

        self.sent.lock().record(verdict.content);
        let _ = self.events.send(event);

        Ok(())
    }

    fn build_request(&self, snapshot: &SessionState) -> AnalysisRequest {
        AnalysisRequest {
            excerpt: snapshot
                .recent_transcript(self.settings.context_entries)
                .to_vec(),
            phase: snapshot.current_phase,
            already_sent: self.sent.lock().snapshot(),
        }
    }
}
