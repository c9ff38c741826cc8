//! Session management
//!
//! One [`Session`] per live training conversation: the state machine, the
//! compliance detector, the advisory dedup list, and whichever advisory
//! loop is currently serving the session's channel. The [`SessionManager`]
//! owns the registry with a capacity cap and idle expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use salescoach_advisor::{AdvisoryHandle, SentSuggestions};
use salescoach_compliance::ViolationDetector;
use salescoach_config::Settings;
use salescoach_core::{ComplianceClassifier, SessionState};
use salescoach_session::SessionMachine;

use crate::ServerError;

/// One live session's server-side resources.
pub struct Session {
    pub id: String,
    pub machine: SessionMachine,
    /// Compliance detector; the screen path takes it mutably, one utterance
    /// at a time
    pub detector: tokio::sync::Mutex<ViolationDetector>,
    /// Session-scoped advisory dedup list, cleared on close
    pub sent: Arc<Mutex<SentSuggestions>>,
    pub created_at: Instant,
    pub last_activity: RwLock<Instant>,
    active: RwLock<bool>,
    /// The advisory loop serving the current channel, if any
    advisory: Mutex<Option<Arc<AdvisoryHandle>>>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        settings: &Settings,
        classifier: Option<Arc<dyn ComplianceClassifier>>,
    ) -> Self {
        let id = id.into();

        let mut detector = ViolationDetector::new(
            settings.compliance.jurisdiction,
            settings.compliance.deep_check_enabled,
        );
        if let Some(classifier) = classifier {
            detector = detector.with_classifier(classifier);
        }

        Self {
            machine: SessionMachine::spawn(SessionState::new(&id)),
            id,
            detector: tokio::sync::Mutex::new(detector),
            sent: Arc::new(Mutex::new(SentSuggestions::new())),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            active: RwLock::new(true),
            advisory: Mutex::new(None),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    pub fn is_active(&self) -> bool {
        *self.active.read()
    }

    /// Install the advisory loop serving a new channel, shutting down the
    /// previous channel's loop first.
    pub fn set_advisory(&self, handle: Arc<AdvisoryHandle>) {
        if let Some(previous) = self.advisory.lock().replace(handle) {
            previous.shutdown();
        }
    }

    /// Release everything session-scoped: the advisory loop and the dedup
    /// list.
    pub fn close(&self) {
        *self.active.write() = false;
        if let Some(advisory) = self.advisory.lock().take() {
            advisory.shutdown();
        }
        self.sent.lock().clear();
    }
}

/// Session registry with capacity cap and idle expiry.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        use salescoach_config::constants::session::{CLEANUP_INTERVAL_SECS, TIMEOUT_SECS};
        Self::with_config(
            max_sessions,
            Duration::from_secs(TIMEOUT_SECS),
            Duration::from_secs(CLEANUP_INTERVAL_SECS),
        )
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that periodically removes expired sessions.
    ///
    /// Returns a shutdown sender for stopping the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = manager.count();
                        manager.cleanup_expired();
                        let after = manager.count();
                        if before != after {
                            tracing::info!(
                                "Session cleanup: removed {} expired sessions ({} remaining)",
                                before - after,
                                after
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session.
    pub fn create(
        &self,
        settings: &Settings,
        classifier: Option<Arc<dyn ComplianceClassifier>>,
    ) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Session("Max sessions reached".to_string()));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&id, settings, classifier));
        sessions.insert(id.clone(), session.clone());

        tracing::info!(
            session_id = %id,
            jurisdiction = ?settings.compliance.jurisdiction,
            deep_check = settings.compliance.deep_check_enabled,
            "Created session"
        );

        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session and release its resources.
    pub fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.remove(id) {
            session.close();
            tracing::info!("Removed session: {}", id);
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions);
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                session.close();
                tracing::info!("Expired session: {}", id);
            }
        }
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let manager = SessionManager::new(10);
        let session = manager.create(&Settings::default(), None).unwrap();

        assert!(session.is_active());
        assert!(!session.is_expired(Duration::from_secs(60)));
        assert!(session.machine.snapshot().session_id.is_some());
    }

    #[tokio::test]
    async fn test_session_get_and_remove() {
        let manager = SessionManager::new(10);
        let session = manager.create(&Settings::default(), None).unwrap();
        let id = session.id.clone();

        assert!(manager.get(&id).is_some());

        manager.remove(&id);
        assert!(manager.get(&id).is_none());
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_capacity_cap() {
        let manager = SessionManager::new(2);
        let settings = Settings::default();

        manager.create(&settings, None).unwrap();
        manager.create(&settings, None).unwrap();

        assert!(manager.create(&settings, None).is_err());
    }

    #[tokio::test]
    async fn test_expiry_frees_capacity() {
        let manager =
            SessionManager::with_config(1, Duration::from_millis(10), Duration::from_secs(300));
        let settings = Settings::default();

        manager.create(&settings, None).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // The expired session is swept to make room.
        assert!(manager.create(&settings, None).is_ok());
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_close_clears_dedup_list() {
        let manager = SessionManager::new(10);
        let session = manager.create(&Settings::default(), None).unwrap();

        session.sent.lock().record("tip one");
        assert_eq!(session.sent.lock().len(), 1);

        session.close();
        assert!(session.sent.lock().is_empty());
    }
}
