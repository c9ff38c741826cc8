//! Application state
//!
//! Shared state across all handlers.

use std::sync::Arc;

use parking_lot::RwLock;

use salescoach_config::Settings;
use salescoach_core::{CoachAnalyzer, ComplianceClassifier};
use salescoach_services::ServiceClients;

use crate::session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Settings>>,
    pub sessions: Arc<SessionManager>,
    /// Coaching analysis backend for advisory loops
    pub analyzer: Arc<dyn CoachAnalyzer>,
    /// Tier-2 compliance backend; detectors consult it only when the
    /// deep-check flag is on
    pub classifier: Arc<dyn ComplianceClassifier>,
}

impl AppState {
    /// Build state with HTTP service backends from settings.
    pub fn new(config: Settings) -> Self {
        let clients = ServiceClients::from_settings(&config.services);
        let max_sessions = config.server.max_sessions;

        Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::new(SessionManager::new(max_sessions)),
            analyzer: Arc::new(clients.analyzer),
            classifier: Arc::new(clients.classifier),
        }
    }

    /// Build state with explicit backends. Tests inject mocks here.
    pub fn with_backends(
        config: Settings,
        analyzer: Arc<dyn CoachAnalyzer>,
        classifier: Arc<dyn ComplianceClassifier>,
    ) -> Self {
        let max_sessions = config.server.max_sessions;
        Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::new(SessionManager::new(max_sessions)),
            analyzer,
            classifier,
        }
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }
}
