//! Microphone capture ownership
//!
//! The device sits behind the [`AudioSource`] capability so real capture
//! backends and test feeds share one contract. [`AudioCapture`] is the one
//! owner of the stream for a session: it acquires the source, drives the
//! segmenter, and forwards events. No second capture may share the source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use salescoach_core::{AudioFrame, AudioSegment};

use crate::segmenter::{Segmenter, SegmenterConfig, SegmenterEvent};
use crate::PipelineError;

/// Capture device capability.
///
/// `start` acquires the device and yields the frame stream; it fails with
/// `PermissionDenied` or `DeviceNotFound`, both non-fatal and reported
/// upward. `stop` releases all resources.
#[async_trait]
pub trait AudioSource: Send + Sync + 'static {
    async fn start(&self) -> Result<mpsc::Receiver<AudioFrame>, PipelineError>;

    async fn stop(&self);

    /// Source name for logging
    fn name(&self) -> &str;
}

/// An [`AudioSource`] fed through a channel.
///
/// Used by transports that receive frames over the network, and by tests.
/// The source hands out its receiver exactly once; a second `start` without
/// an intervening `stop` is `CaptureBusy`. The feeder side is handed off,
/// not cloned, so the frame stream closes when the feeder drops. That is
/// how device loss surfaces.
pub struct ChannelAudioSource {
    receiver: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    sender: Mutex<Option<mpsc::Sender<AudioFrame>>>,
}

impl ChannelAudioSource {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            receiver: Mutex::new(Some(receiver)),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Take the feeding handle. Available exactly once.
    pub fn feed(&self) -> Option<mpsc::Sender<AudioFrame>> {
        self.sender.lock().take()
    }
}

#[async_trait]
impl AudioSource for ChannelAudioSource {
    async fn start(&self) -> Result<mpsc::Receiver<AudioFrame>, PipelineError> {
        self.receiver
            .lock()
            .take()
            .ok_or(PipelineError::CaptureBusy)
    }

    async fn stop(&self) {}

    fn name(&self) -> &str {
        "channel"
    }
}

/// Events forwarded from the capture/segmentation task
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Measured input level, independent of the segmentation decision
    Level(f32),
    SpeechStart { at: f64 },
    SpeechEnd { at: f64 },
    /// Finalized utterance, handed off for transcription
    Segment(AudioSegment),
    Discarded { duration: Duration },
    /// The device failed mid-session; segmentation halted
    DeviceError(String),
    /// Capture stopped cleanly
    Stopped,
}

impl From<SegmenterEvent> for CaptureEvent {
    fn from(event: SegmenterEvent) -> Self {
        match event {
            SegmenterEvent::Level(l) => CaptureEvent::Level(l),
            SegmenterEvent::SpeechStart { at } => CaptureEvent::SpeechStart { at },
            SegmenterEvent::SpeechEnd { at } => CaptureEvent::SpeechEnd { at },
            SegmenterEvent::Segment(s) => CaptureEvent::Segment(s),
            SegmenterEvent::Discarded { duration } => CaptureEvent::Discarded { duration },
        }
    }
}

/// Exclusive owner of the capture stream for a session.
pub struct AudioCapture {
    source: Arc<dyn AudioSource>,
    config: SegmenterConfig,
    running: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new(source: Arc<dyn AudioSource>, config: SegmenterConfig) -> Self {
        Self {
            source,
            config,
            running: Arc::new(AtomicBool::new(false)),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Acquire the device and start segmenting.
    ///
    /// Returns the capture event stream, or the device error when the source
    /// cannot be acquired. Only one capture may run at a time.
    pub async fn start(&self) -> Result<mpsc::Receiver<CaptureEvent>, PipelineError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::CaptureBusy);
        }
        self.stopping.store(false, Ordering::Release);

        let mut frames = match self.source.start().await {
            Ok(frames) => frames,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            },
        };

        let (event_tx, event_rx) = mpsc::channel(64);
        let mut segmenter = Segmenter::new(self.config.clone());
        let running = self.running.clone();
        let stopping = self.stopping.clone();
        let source_name = self.source.name().to_string();

        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                match segmenter.process_frame(&frame) {
                    Ok(events) => {
                        for event in events {
                            if event_tx.send(event.into()).await.is_err() {
                                running.store(false, Ordering::Release);
                                return;
                            }
                        }
                    },
                    Err(e) => {
                        tracing::error!(source = %source_name, "segmentation failed: {}", e);
                        let _ = event_tx.send(CaptureEvent::DeviceError(e.to_string())).await;
                        running.store(false, Ordering::Release);
                        return;
                    },
                }
            }

            // Frame stream closed: a deliberate stop flushes the open
            // utterance; anything else is device loss.
            if stopping.load(Ordering::Acquire) {
                if let Ok(events) = segmenter.finish() {
                    for event in events {
                        let _ = event_tx.send(event.into()).await;
                    }
                }
                let _ = event_tx.send(CaptureEvent::Stopped).await;
                tracing::debug!(source = %source_name, "capture stopped");
            } else {
                tracing::warn!(source = %source_name, "capture device lost mid-session");
                let _ = event_tx
                    .send(CaptureEvent::DeviceError("capture device lost".to_string()))
                    .await;
            }
            running.store(false, Ordering::Release);
        });

        Ok(event_rx)
    }

    /// Release the device. The open utterance, if any, is flushed and a
    /// `Stopped` event closes the stream.
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.source.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 16000;

    fn frame(level: f32, sequence: u64) -> AudioFrame {
        AudioFrame::new(vec![level; 800], SAMPLE_RATE, sequence)
    }

    struct DeniedSource;

    #[async_trait]
    impl AudioSource for DeniedSource {
        async fn start(&self) -> Result<mpsc::Receiver<AudioFrame>, PipelineError> {
            Err(PipelineError::PermissionDenied)
        }

        async fn stop(&self) {}

        fn name(&self) -> &str {
            "denied"
        }
    }

    #[tokio::test]
    async fn test_permission_denied_reported_upward() {
        let capture = AudioCapture::new(Arc::new(DeniedSource), SegmenterConfig::default());

        assert!(matches!(
            capture.start().await,
            Err(PipelineError::PermissionDenied)
        ));
        // Non-fatal: capture can be retried once the user grants access.
        assert!(!capture.is_running());
    }

    #[tokio::test]
    async fn test_exclusive_capture() {
        let source = Arc::new(ChannelAudioSource::new(16));
        let capture = AudioCapture::new(source, SegmenterConfig::default());

        let _events = capture.start().await.unwrap();
        assert!(capture.is_running());

        // The microphone stream has exactly one owner.
        assert!(matches!(
            capture.start().await,
            Err(PipelineError::CaptureBusy)
        ));
    }

    #[tokio::test]
    async fn test_capture_segments_speech() {
        let source = Arc::new(ChannelAudioSource::new(128));
        let feed = source.feed().unwrap();
        let capture = AudioCapture::new(source, SegmenterConfig::default());

        let mut events = capture.start().await.unwrap();

        // 1s speech then 1.5s silence
        for i in 0..20 {
            feed.send(frame(0.3, i)).await.unwrap();
        }
        for i in 20..50 {
            feed.send(frame(0.0, i)).await.unwrap();
        }

        let mut saw_start = false;
        let mut saw_segment = false;
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::SpeechStart { .. } => saw_start = true,
                CaptureEvent::Segment(segment) => {
                    assert!((segment.duration.as_secs_f64() - 1.0).abs() < 1e-6);
                    saw_segment = true;
                    break;
                },
                _ => {},
            }
        }
        assert!(saw_start);
        assert!(saw_segment);
    }

    #[tokio::test]
    async fn test_device_loss_reported() {
        let source = Arc::new(ChannelAudioSource::new(16));
        let feed = source.feed().unwrap();
        let capture = AudioCapture::new(source, SegmenterConfig::default());

        let mut events = capture.start().await.unwrap();

        feed.send(frame(0.3, 0)).await.unwrap();
        // Dropping the feed without stop() is device loss, not a clean stop.
        drop(feed);

        let mut saw_error = false;
        while let Some(event) = events.recv().await {
            if let CaptureEvent::DeviceError(_) = event {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_clean_stop_flushes_and_closes() {
        let source = Arc::new(ChannelAudioSource::new(64));
        let feed = source.feed().unwrap();
        let capture = AudioCapture::new(source, SegmenterConfig::default());

        let mut events = capture.start().await.unwrap();

        // 200ms of active signal, then immediate stop: below the minimum,
        // so nothing is emitted and capture winds down cleanly.
        for i in 0..4 {
            feed.send(frame(0.3, i)).await.unwrap();
        }
        capture.stop().await;
        drop(feed);

        let mut saw_segment = false;
        let mut saw_stopped = false;
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Segment(_) => saw_segment = true,
                CaptureEvent::Stopped => saw_stopped = true,
                _ => {},
            }
        }
        assert!(!saw_segment);
        assert!(saw_stopped);
    }
}
