//! Playback controller
//!
//! Plays one synthesized clip at a time. `play` implicitly interrupts
//! whatever is playing; progress is reported on a fixed tick; decode and
//! output failures surface as typed errors and always leave the controller
//! idle, never stuck in a playing state.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::PipelineError;

/// Output device capability. Implementations buffer the clip themselves;
/// the controller owns timing and state.
pub trait AudioSink: Send + Sync + 'static {
    fn play(&self, clip: &[u8]) -> Result<(), PipelineError>;
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    fn set_volume(&self, volume: f32);
}

/// Sink that discards audio; headless runs and tests.
#[derive(Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _clip: &[u8]) -> Result<(), PipelineError> {
        Ok(())
    }
    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
    fn set_volume(&self, _volume: f32) {}
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Playback lifecycle events
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    Started { duration: Duration },
    Progress { elapsed: Duration, total: Duration },
    Finished,
    Stopped,
    Paused,
    Resumed,
    Failed(String),
}

/// Progress tick cadence
const PROGRESS_TICK: Duration = Duration::from_millis(100);

struct Shared {
    state: Mutex<PlaybackState>,
    volume: Mutex<f32>,
    /// Bumped on every play/stop so a superseded progress task can tell it
    /// is stale and exit without emitting
    generation: AtomicU64,
}

/// Plays a single synthesized-speech clip at a time.
pub struct PlaybackController {
    sink: Arc<dyn AudioSink>,
    shared: Arc<Shared>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            sink,
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState::Idle),
                volume: Mutex::new(1.0),
                generation: AtomicU64::new(0),
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        *self.shared.state.lock()
    }

    pub fn volume(&self) -> f32 {
        *self.shared.volume.lock()
    }

    /// Set output volume, clamped to [0.0, 1.0].
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.shared.volume.lock() = clamped;
        self.sink.set_volume(clamped);
    }

    /// Play a WAV clip, stopping any current playback first.
    ///
    /// Decode failures return `PipelineError::Decode` and leave the
    /// controller idle.
    pub fn play(&self, clip: Vec<u8>) -> Result<(), PipelineError> {
        // Implicit interruption: at most one active clip.
        let generation = self.interrupt_current();
        self.sink.stop();

        let duration = clip_duration(&clip).map_err(|e| {
            *self.shared.state.lock() = PlaybackState::Idle;
            let _ = self.events.send(PlaybackEvent::Failed(e.to_string()));
            e
        })?;

        if let Err(e) = self.sink.play(&clip) {
            *self.shared.state.lock() = PlaybackState::Idle;
            let _ = self.events.send(PlaybackEvent::Failed(e.to_string()));
            return Err(e);
        }

        *self.shared.state.lock() = PlaybackState::Playing;
        let _ = self.events.send(PlaybackEvent::Started { duration });

        let shared = self.shared.clone();
        let events = self.events.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if shared.generation.load(Ordering::Acquire) != generation {
                    // Superseded by a newer play() or stop().
                    return;
                }

                match *shared.state.lock() {
                    PlaybackState::Playing => {
                        elapsed += PROGRESS_TICK;
                        if elapsed >= duration {
                            break;
                        }
                        let _ = events.send(PlaybackEvent::Progress {
                            elapsed,
                            total: duration,
                        });
                    },
                    PlaybackState::Paused => {},
                    PlaybackState::Idle => return,
                }
            }

            if shared.generation.load(Ordering::Acquire) == generation {
                sink.stop();
                *shared.state.lock() = PlaybackState::Idle;
                let _ = events.send(PlaybackEvent::Finished);
            }
        });

        Ok(())
    }

    /// Stop playback and return to idle.
    pub fn stop(&self) {
        self.interrupt_current();
        let was_active = {
            let mut state = self.shared.state.lock();
            let active = *state != PlaybackState::Idle;
            *state = PlaybackState::Idle;
            active
        };
        self.sink.stop();
        if was_active {
            let _ = self.events.send(PlaybackEvent::Stopped);
        }
    }

    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        if *state == PlaybackState::Playing {
            *state = PlaybackState::Paused;
            self.sink.pause();
            let _ = self.events.send(PlaybackEvent::Paused);
        }
    }

    pub fn resume(&self) {
        let mut state = self.shared.state.lock();
        if *state == PlaybackState::Paused {
            *state = PlaybackState::Playing;
            self.sink.resume();
            let _ = self.events.send(PlaybackEvent::Resumed);
        }
    }

    /// Invalidate any in-flight progress task; returns the new generation.
    fn interrupt_current(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Read clip duration from the WAV header.
fn clip_duration(clip: &[u8]) -> Result<Duration, PipelineError> {
    let reader =
        hound::WavReader::new(Cursor::new(clip)).map_err(|e| PipelineError::Decode(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(PipelineError::Decode("zero sample rate".to_string()));
    }
    Ok(Duration::from_secs_f64(
        reader.duration() as f64 / spec.sample_rate as f64,
    ))
}
