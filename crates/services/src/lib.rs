//! HTTP clients for the engine's external collaborators
//!
//! One reqwest-backed implementation per core capability trait. Each client
//! enforces its resource ceiling synchronously, before any network call is
//! attempted, and maps transport failures onto the engine's error taxonomy:
//! timeouts and connection failures are `Transient`, non-success statuses
//! are `RemoteService`.

pub mod analysis;
pub mod speech;
pub mod token;

pub use analysis::{HttpCoachAnalyzer, HttpComplianceClassifier};
pub use speech::{HttpSpeechSynthesizer, HttpTranscriber};
pub use token::HttpTokenIssuer;

use std::time::Duration;

use salescoach_config::ServiceEndpoints;
use salescoach_core::Error;

/// Build a reqwest client with the configured request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Map a reqwest failure onto the engine taxonomy.
pub(crate) fn map_transport(service: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() {
        Error::Transient(format!("{}: {}", service, err))
    } else {
        Error::RemoteService(format!("{}: {}", service, err))
    }
}

/// The full set of service clients, built from settings.
pub struct ServiceClients {
    pub transcriber: HttpTranscriber,
    pub synthesizer: HttpSpeechSynthesizer,
    pub analyzer: HttpCoachAnalyzer,
    pub classifier: HttpComplianceClassifier,
    pub tokens: HttpTokenIssuer,
}

impl ServiceClients {
    pub fn from_settings(endpoints: &ServiceEndpoints) -> Self {
        let timeout = endpoints.request_timeout_secs;
        Self {
            transcriber: HttpTranscriber::new(&endpoints.transcription_url, timeout),
            synthesizer: HttpSpeechSynthesizer::new(&endpoints.synthesis_url, timeout),
            analyzer: HttpCoachAnalyzer::new(&endpoints.analysis_url, timeout),
            classifier: HttpComplianceClassifier::new(&endpoints.compliance_url, timeout),
            tokens: HttpTokenIssuer::new(&endpoints.token_url, timeout),
        }
    }
}
