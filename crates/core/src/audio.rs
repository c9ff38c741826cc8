//! Audio frame and segment types

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// A short chunk of captured audio with its measured level.
///
/// Frames are produced by the capture layer on a fixed cadence (≈50 ms) and
/// consumed by the segmenter. Samples are f32 normalized to [-1.0, 1.0];
/// `level` is full-scale RMS in [0.0, 1.0] so it can be compared directly
/// against the silence threshold and forwarded to UI meters.
#[derive(Clone)]
pub struct AudioFrame {
    /// Raw audio samples (mono f32, normalized to [-1.0, 1.0])
    pub samples: Arc<[f32]>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Duration of this frame
    pub duration: Duration,
    /// Full-scale RMS level in [0.0, 1.0]
    pub level: f32,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .field("level", &self.level)
            .finish()
    }
}

impl AudioFrame {
    /// Create a frame from f32 samples, computing duration and RMS level.
    pub fn new(samples: Vec<f32>, sample_rate: u32, sequence: u64) -> Self {
        let duration = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
        let level = rms_level(&samples);

        Self {
            samples: samples.into(),
            sample_rate,
            sequence,
            duration,
            level,
        }
    }

    /// Convert from PCM16 bytes (little-endian).
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32, sequence: u64) -> Self {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|chunk| {
                let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                sample as f32 / 32768.0
            })
            .collect();

        Self::new(samples, sample_rate, sequence)
    }

    /// Whether the frame is at or below the given silence threshold.
    pub fn is_silent(&self, threshold: f32) -> bool {
        self.level <= threshold
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Full-scale RMS of a sample buffer, in [0.0, 1.0].
fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt().clamp(0.0, 1.0)
}

/// One finalized utterance, handed off to transcription exactly once.
///
/// The segmenter produces these; after the transcription call the bytes are
/// dropped; nothing retains ownership of a consumed segment.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Encoded audio bytes (WAV container)
    pub data: Vec<u8>,
    /// MIME descriptor for the encoded bytes
    pub mime: &'static str,
    /// Seconds since session start when speech began
    pub started_at: f64,
    /// Duration of the active speech run
    pub duration: Duration,
}

impl AudioSegment {
    /// Encode buffered samples into a 16-bit PCM WAV segment.
    pub fn from_samples(
        samples: &[f32],
        sample_rate: u32,
        started_at: f64,
        duration: Duration,
    ) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::InvalidInput(format!("wav encode: {}", e)))?;
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0);
                writer
                    .write_sample((clamped * 32767.0) as i16)
                    .map_err(|e| Error::InvalidInput(format!("wav encode: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| Error::InvalidInput(format!("wav encode: {}", e)))?;
        }

        Ok(Self {
            data: cursor.into_inner(),
            mime: "audio/wav",
            started_at,
            duration,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
