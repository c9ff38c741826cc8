//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use salescoach_core::Jurisdiction;

use crate::constants::{advisory, audio, endpoints, session, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice-activity segmenter tuning
    #[serde(default)]
    pub segmenter: SegmenterSettings,

    /// Advisory channel cadence
    #[serde(default)]
    pub advisory: AdvisorySettings,

    /// Compliance screening flags
    #[serde(default)]
    pub compliance: ComplianceSettings,

    /// External service endpoints
    #[serde(default)]
    pub services: ServiceEndpoints,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8800
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    session::MAX_SESSIONS
}

fn default_session_timeout() -> u64 {
    session::TIMEOUT_SECS
}

fn default_cleanup_interval() -> u64 {
    session::CLEANUP_INTERVAL_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Voice-activity segmenter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterSettings {
    /// Silence threshold as a fraction of full scale
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    /// Silence duration that finalizes an utterance (ms)
    #[serde(default = "default_silence_hold")]
    pub silence_hold_ms: u64,
    /// Minimum speech duration for a segment to be emitted (ms)
    #[serde(default = "default_min_speech")]
    pub min_speech_ms: u64,
    /// Level sampling cadence (ms)
    #[serde(default = "default_level_interval")]
    pub level_interval_ms: u64,
}

fn default_silence_threshold() -> f32 {
    audio::SILENCE_THRESHOLD
}

fn default_silence_hold() -> u64 {
    audio::SILENCE_HOLD_MS
}

fn default_min_speech() -> u64 {
    audio::MIN_SPEECH_MS
}

fn default_level_interval() -> u64 {
    audio::LEVEL_INTERVAL_MS
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            silence_threshold: default_silence_threshold(),
            silence_hold_ms: default_silence_hold(),
            min_speech_ms: default_min_speech(),
            level_interval_ms: default_level_interval(),
        }
    }
}

/// Advisory channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorySettings {
    /// Analysis cadence (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Client reconnect delay after a channel error (seconds)
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Transcript entries included per analysis request
    #[serde(default = "default_context_entries")]
    pub context_entries: usize,
    /// Hard skip below this many transcript entries
    #[serde(default = "default_min_entries")]
    pub min_transcript_entries: usize,
}

fn default_poll_interval() -> u64 {
    advisory::POLL_INTERVAL_SECS
}

fn default_reconnect_delay() -> u64 {
    advisory::RECONNECT_DELAY_SECS
}

fn default_context_entries() -> usize {
    advisory::CONTEXT_ENTRIES
}

fn default_min_entries() -> usize {
    advisory::MIN_TRANSCRIPT_ENTRIES
}

impl Default for AdvisorySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            reconnect_delay_secs: default_reconnect_delay(),
            context_entries: default_context_entries(),
            min_transcript_entries: default_min_entries(),
        }
    }
}

/// Compliance screening settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComplianceSettings {
    /// Escalate to the external deep-check when tier 1 finds nothing
    #[serde(default)]
    pub deep_check_enabled: bool,
    /// Which tier-1 trigger table applies
    #[serde(default)]
    pub jurisdiction: Jurisdiction,
}

/// External service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    #[serde(default = "default_transcription_url")]
    pub transcription_url: String,
    #[serde(default = "default_synthesis_url")]
    pub synthesis_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_analysis_url")]
    pub analysis_url: String,
    #[serde(default = "default_compliance_url")]
    pub compliance_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_transcription_url() -> String {
    endpoints::TRANSCRIPTION_DEFAULT.to_string()
}

fn default_synthesis_url() -> String {
    endpoints::SYNTHESIS_DEFAULT.to_string()
}

fn default_token_url() -> String {
    endpoints::TOKEN_DEFAULT.to_string()
}

fn default_analysis_url() -> String {
    endpoints::ANALYSIS_DEFAULT.to_string()
}

fn default_compliance_url() -> String {
    endpoints::COMPLIANCE_DEFAULT.to_string()
}

fn default_request_timeout() -> u64 {
    timeouts::TRANSCRIPTION_SECS
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            transcription_url: default_transcription_url(),
            synthesis_url: default_synthesis_url(),
            token_url: default_token_url(),
            analysis_url: default_analysis_url(),
            compliance_url: default_compliance_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings against the engine's operational bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_segmenter()?;
        self.validate_advisory()?;
        self.validate_server()?;
        Ok(())
    }

    fn validate_segmenter(&self) -> Result<(), ConfigError> {
        let seg = &self.segmenter;

        if !(0.0..1.0).contains(&seg.silence_threshold) || seg.silence_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.silence_threshold".to_string(),
                message: format!(
                    "Must be a fraction of full scale in (0.0, 1.0), got {}",
                    seg.silence_threshold
                ),
            });
        }

        if !(100..=10_000).contains(&seg.silence_hold_ms) {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.silence_hold_ms".to_string(),
                message: format!("Must be between 100 and 10000, got {}", seg.silence_hold_ms),
            });
        }

        if !(100..=5_000).contains(&seg.min_speech_ms) {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.min_speech_ms".to_string(),
                message: format!("Must be between 100 and 5000, got {}", seg.min_speech_ms),
            });
        }

        if !(10..=500).contains(&seg.level_interval_ms) {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.level_interval_ms".to_string(),
                message: format!("Must be between 10 and 500, got {}", seg.level_interval_ms),
            });
        }

        Ok(())
    }

    fn validate_advisory(&self) -> Result<(), ConfigError> {
        let adv = &self.advisory;

        if !(1..=300).contains(&adv.poll_interval_secs) {
            return Err(ConfigError::InvalidValue {
                field: "advisory.poll_interval_secs".to_string(),
                message: format!("Must be between 1 and 300, got {}", adv.poll_interval_secs),
            });
        }

        if !(1..=60).contains(&adv.reconnect_delay_secs) {
            return Err(ConfigError::InvalidValue {
                field: "advisory.reconnect_delay_secs".to_string(),
                message: format!("Must be between 1 and 60, got {}", adv.reconnect_delay_secs),
            });
        }

        if adv.context_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisory.context_entries".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if adv.min_transcript_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisory.min_transcript_entries".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.server.session_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.session_timeout_secs".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Layering, lowest to highest precedence:
/// 1. `config/default.toml` (optional)
/// 2. `config/{env}.toml` for the given environment (optional)
/// 3. `SALESCOACH_*` environment variables (`__` as section separator)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
    }

    let settings: Settings = builder
        .add_source(Environment::with_prefix("SALESCOACH").separator("__"))
        .build()?
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.segmenter.silence_threshold, 0.02);
        assert_eq!(settings.segmenter.silence_hold_ms, 1500);
        assert_eq!(settings.segmenter.min_speech_ms, 500);
        assert_eq!(settings.advisory.poll_interval_secs, 15);
        assert_eq!(settings.advisory.reconnect_delay_secs, 5);
        assert!(!settings.compliance.deep_check_enabled);
    }

    #[test]
    fn test_rejects_threshold_out_of_scale() {
        let mut settings = Settings::default();
        settings.segmenter.silence_threshold = 1.5;
        assert!(settings.validate().is_err());

        settings.segmenter.silence_threshold = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_advisory_cadence() {
        let mut settings = Settings::default();
        settings.advisory.poll_interval_secs = 0;
        assert!(settings.validate().is_err());

        settings.advisory.poll_interval_secs = 301;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut settings = Settings::default();
        settings.server.max_sessions = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_boundary_values_accepted() {
        let mut settings = Settings::default();
        settings.segmenter.silence_hold_ms = 100;
        settings.segmenter.min_speech_ms = 100;
        settings.advisory.poll_interval_secs = 1;
        assert!(settings.validate().is_ok());
    }
}
