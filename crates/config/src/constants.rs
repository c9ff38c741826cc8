//! Centralized constants for the coaching session engine
//!
//! Single source of truth for defaults and hard limits used across the
//! workspace. Settings fall back to these; components never hardcode their
//! own copies.

/// Audio capture and segmentation defaults
pub mod audio {
    /// Capture sample rate (Hz)
    pub const SAMPLE_RATE: u32 = 16000;

    /// Level sampling cadence (ms)
    pub const LEVEL_INTERVAL_MS: u64 = 50;

    /// Silence threshold as a fraction of full scale; frames at or below
    /// are silent
    pub const SILENCE_THRESHOLD: f32 = 0.02;

    /// Silence duration that finalizes an utterance (ms)
    pub const SILENCE_HOLD_MS: u64 = 1500;

    /// Minimum speaking duration for a segment to be emitted (ms);
    /// shorter runs are discarded as noise
    pub const MIN_SPEECH_MS: u64 = 500;
}

/// Advisory channel defaults
pub mod advisory {
    /// Analysis cadence (seconds)
    pub const POLL_INTERVAL_SECS: u64 = 15;

    /// Client reconnect delay after a channel error (seconds)
    pub const RECONNECT_DELAY_SECS: u64 = 5;

    /// Transcript entries included in each analysis request
    pub const CONTEXT_ENTRIES: usize = 6;

    /// Hard skip below this many transcript entries
    pub const MIN_TRANSCRIPT_ENTRIES: usize = 2;

    /// Cap on the session-scoped sent-suggestion dedup list
    pub const SENT_LIST_CAP: usize = 256;

    /// Broadcast buffer between the advisory loop and its subscribers
    pub const CHANNEL_CAPACITY: usize = 64;
}

/// Resource ceilings enforced before any external call
pub mod limits {
    /// Maximum audio payload accepted by transcription (bytes)
    pub const TRANSCRIPTION_MAX_BYTES: usize = 25 * 1024 * 1024;

    /// Maximum text length accepted by synthesis (characters)
    pub const SYNTHESIS_MAX_CHARS: usize = 4096;

    /// Synthesis speed multiplier bounds
    pub const SPEED_MIN: f32 = 0.25;
    pub const SPEED_MAX: f32 = 4.0;

    /// Counterpart token validity (seconds)
    pub const TOKEN_TTL_SECS: i64 = 600;
}

/// External call timeouts (seconds)
pub mod timeouts {
    pub const TRANSCRIPTION_SECS: u64 = 30;
    pub const SYNTHESIS_SECS: u64 = 30;
    pub const ANALYSIS_SECS: u64 = 20;
    pub const TOKEN_SECS: u64 = 10;
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    pub const TRANSCRIPTION_DEFAULT: &str = "http://localhost:8801/v1/transcribe";
    pub const SYNTHESIS_DEFAULT: &str = "http://localhost:8802/v1/synthesize";
    pub const TOKEN_DEFAULT: &str = "http://localhost:8803/v1/tokens";
    pub const ANALYSIS_DEFAULT: &str = "http://localhost:8804/v1/coach";
    pub const COMPLIANCE_DEFAULT: &str = "http://localhost:8805/v1/screen";
}

/// Session registry defaults
pub mod session {
    pub const MAX_SESSIONS: usize = 100;

    /// Idle timeout before a session is expired (seconds)
    pub const TIMEOUT_SECS: u64 = 3600;

    /// Expiry sweep cadence (seconds)
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_ordering() {
        // A valid utterance must outlast the level cadence, and the silence
        // hold must outlast the minimum speech duration for mid-sentence
        // pauses to be tolerated.
        assert!(audio::MIN_SPEECH_MS > audio::LEVEL_INTERVAL_MS);
        assert!(audio::SILENCE_HOLD_MS > audio::MIN_SPEECH_MS);
    }

    #[test]
    fn test_threshold_in_full_scale() {
        assert!(audio::SILENCE_THRESHOLD > 0.0 && audio::SILENCE_THRESHOLD < 1.0);
    }

    #[test]
    fn test_speed_bounds() {
        assert!(limits::SPEED_MIN < 1.0 && 1.0 < limits::SPEED_MAX);
    }

    #[test]
    fn test_advisory_context_covers_skip_floor() {
        assert!(advisory::CONTEXT_ENTRIES >= advisory::MIN_TRANSCRIPT_ENTRIES);
    }
}
