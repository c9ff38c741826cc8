//! Transcription and synthesis clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use salescoach_config::constants::limits;
use salescoach_core::{AudioSegment, Error, Result, SpeechSynthesizer, Transcriber, VoiceSelector};

use crate::{build_client, map_transport};

/// Speech-to-text over HTTP: the segment's WAV bytes are posted as the
/// request body and the service returns the transcribed text.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    max_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
            max_bytes: limits::TRANSCRIPTION_MAX_BYTES,
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        if segment.len() > self.max_bytes {
            return Err(Error::ResourceLimit {
                what: "transcription audio bytes",
                limit: self.max_bytes as u64,
                actual: segment.len() as u64,
            });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, segment.mime)
            .body(segment.data.clone())
            .send()
            .await
            .map_err(|e| map_transport("transcription", e))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "transcription returned {}",
                response.status()
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("transcription response: {}", e)))?;

        tracing::debug!(chars = parsed.text.len(), "utterance transcribed");
        Ok(parsed.text)
    }

    fn max_payload_bytes(&self) -> usize {
        self.max_bytes
    }

    fn service_name(&self) -> &str {
        "http-transcriber"
    }
}

/// Text-to-speech over HTTP.
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    max_chars: usize,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
}

impl HttpSpeechSynthesizer {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
            max_chars: limits::SYNTHESIS_MAX_CHARS,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceSelector) -> Result<Vec<u8>> {
        let chars = text.chars().count();
        if chars > self.max_chars {
            return Err(Error::ResourceLimit {
                what: "synthesis text chars",
                limit: self.max_chars as u64,
                actual: chars as u64,
            });
        }

        let request = SynthesisRequest {
            text,
            voice: &voice.voice,
            // The selector already clamps; clamp again at the boundary so a
            // hand-built selector cannot smuggle an out-of-range multiplier.
            speed: voice.speed.clamp(limits::SPEED_MIN, limits::SPEED_MAX),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport("synthesis", e))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "synthesis returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::RemoteService(format!("synthesis response: {}", e)))?;

        Ok(bytes.to_vec())
    }

    fn max_input_chars(&self) -> usize {
        self.max_chars
    }

    fn service_name(&self) -> &str {
        "http-synthesizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_oversized_audio_rejected_before_any_call() {
        let transcriber = HttpTranscriber::new("http://127.0.0.1:1/unreachable", 1);
        let segment = AudioSegment {
            data: vec![0u8; limits::TRANSCRIPTION_MAX_BYTES + 1],
            mime: "audio/wav",
            started_at: 0.0,
            duration: StdDuration::from_secs(1),
        };

        // The endpoint is unreachable; a synchronous rejection proves no
        // call was attempted.
        let result = transcriber.transcribe(&segment).await;
        assert!(matches!(result, Err(Error::ResourceLimit { .. })));
    }

    #[tokio::test]
    async fn test_overlong_text_rejected_before_any_call() {
        let synthesizer = HttpSpeechSynthesizer::new("http://127.0.0.1:1/unreachable", 1);
        let text = "a".repeat(limits::SYNTHESIS_MAX_CHARS + 1);

        let result = synthesizer
            .synthesize(&text, &VoiceSelector::new("narrator"))
            .await;
        assert!(matches!(result, Err(Error::ResourceLimit { .. })));
    }

    #[test]
    fn test_synthesis_request_shape() {
        let request = SynthesisRequest {
            text: "hello",
            voice: "narrator",
            speed: 1.25,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["voice"], "narrator");
        assert_eq!(json["speed"], 1.25);
    }
}
