//! Speech service interfaces: transcription and synthesis

use async_trait::async_trait;

use crate::audio::AudioSegment;
use crate::error::Result;

/// Speech-to-text interface.
///
/// Consumes a finalized [`AudioSegment`] exactly once and returns the
/// transcribed text. Implementations must reject oversized payloads with
/// `Error::ResourceLimit` before any network call.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe one utterance segment.
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String>;

    /// Hard ceiling on accepted payload size in bytes.
    fn max_payload_bytes(&self) -> usize;

    /// Service name for logging
    fn service_name(&self) -> &str;
}

/// Voice selection for synthesis
#[derive(Debug, Clone)]
pub struct VoiceSelector {
    /// Provider-specific voice identifier
    pub voice: String,
    /// Speed multiplier, clamped to [0.25, 4.0]
    pub speed: f32,
}

impl VoiceSelector {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            speed: 1.0,
        }
    }

    /// Set the speed multiplier; out-of-range values are clamped rather
    /// than rejected.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(0.25, 4.0);
        self
    }
}

/// Text-to-speech interface.
///
/// Returns encoded audio bytes suitable for the playback controller.
/// Over-length text is rejected with `Error::ResourceLimit` before any
/// network call.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text with the given voice.
    async fn synthesize(&self, text: &str, voice: &VoiceSelector) -> Result<Vec<u8>>;

    /// Hard ceiling on input length in characters.
    fn max_input_chars(&self) -> usize;

    /// Service name for logging
    fn service_name(&self) -> &str;
}
