//! Audio pipeline: capture ownership, voice-activity segmentation, playback
//!
//! The capture layer owns the one microphone stream and feeds fixed-cadence
//! frames to the segmenter, which turns the continuous signal into discrete
//! utterance segments without a push-to-talk button. The playback controller
//! plays one synthesized clip at a time with hard interruption.

pub mod capture;
pub mod playback;
pub mod segmenter;

pub use capture::{AudioCapture, AudioSource, CaptureEvent, ChannelAudioSource};
pub use playback::{AudioSink, NullSink, PlaybackController, PlaybackEvent, PlaybackState};
pub use segmenter::{Segmenter, SegmenterConfig, SegmenterEvent, SegmenterState};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio capture device not found")]
    DeviceNotFound,

    #[error("capture already running")]
    CaptureBusy,

    #[error("capture device lost: {0}")]
    DeviceLost(String),

    #[error("audio encode error: {0}")]
    Encode(String),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("playback error: {0}")]
    Playback(String),
}

impl From<PipelineError> for salescoach_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::PermissionDenied => salescoach_core::Error::PermissionDenied,
            PipelineError::DeviceNotFound => salescoach_core::Error::DeviceNotFound,
            PipelineError::DeviceLost(msg) => salescoach_core::Error::DeviceLost(msg),
            other => salescoach_core::Error::InvalidInput(other.to_string()),
        }
    }
}
