//! Voice-activity segmentation
//!
//! Turns a continuous frame stream into discrete utterance segments. The
//! algorithm is frame-duration driven rather than wall-clock driven, so the
//! whole state machine is testable with synthetic frames.
//!
//! - The first active frame after silence starts buffering and emits
//!   `SpeechStart`.
//! - A silence run shorter than the hold duration is absorbed into the
//!   utterance (mid-sentence pauses do not split it).
//! - When accumulated silence reaches the hold duration, the utterance is
//!   finalized: runs at or above the minimum speech duration become a WAV
//!   segment trimmed to the active bounds, shorter runs are discarded as
//!   noise.

use std::time::Duration;

use salescoach_core::{AudioFrame, AudioSegment};

use crate::PipelineError;

/// Segmenter tuning
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Full-scale RMS at or below which a frame is silent
    pub silence_threshold: f32,
    /// Silence duration that finalizes an utterance
    pub silence_hold: Duration,
    /// Minimum active duration for a segment to be emitted
    pub min_speech: Duration,
    /// Sample rate of incoming frames (Hz)
    pub sample_rate: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        use salescoach_config::constants::audio::{
            MIN_SPEECH_MS, SAMPLE_RATE, SILENCE_HOLD_MS, SILENCE_THRESHOLD,
        };

        Self {
            silence_threshold: SILENCE_THRESHOLD,
            silence_hold: Duration::from_millis(SILENCE_HOLD_MS),
            min_speech: Duration::from_millis(MIN_SPEECH_MS),
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl SegmenterConfig {
    /// Build from validated settings.
    pub fn from_settings(settings: &salescoach_config::SegmenterSettings) -> Self {
        Self {
            silence_threshold: settings.silence_threshold,
            silence_hold: Duration::from_millis(settings.silence_hold_ms),
            min_speech: Duration::from_millis(settings.min_speech_ms),
            ..Self::default()
        }
    }
}

/// Segmenter state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmenterState {
    /// No speech in progress
    #[default]
    Idle,
    /// Buffering an active utterance
    Speaking,
    /// Utterance still open, silence accumulating toward the hold duration
    Trailing,
}

/// Events produced while processing frames
#[derive(Debug, Clone)]
pub enum SegmenterEvent {
    /// Measured level of the frame, reported on every frame regardless of
    /// the segmentation decision (UI meters)
    Level(f32),
    /// Speech detected; `at` is seconds since the segmenter started
    SpeechStart { at: f64 },
    /// The utterance ended; `at` is the end of the active run
    SpeechEnd { at: f64 },
    /// Finalized utterance, ready for transcription
    Segment(AudioSegment),
    /// Active run was shorter than the minimum; buffer dropped as noise
    Discarded { duration: Duration },
}

/// Voice-activity segmenter
pub struct Segmenter {
    config: SegmenterConfig,
    state: SegmenterState,
    /// Seconds of audio processed so far
    clock: f64,
    /// Start of the current utterance (seconds)
    started_at: f64,
    /// End of the most recent active frame (seconds)
    active_end: f64,
    /// Silence accumulated since the last active frame
    silence: Duration,
    buffer: Vec<f32>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: SegmenterState::Idle,
            clock: 0.0,
            started_at: 0.0,
            active_end: 0.0,
            silence: Duration::ZERO,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Seconds of audio consumed so far.
    pub fn position(&self) -> f64 {
        self.clock
    }

    /// Process one capture frame, returning any events it produced.
    pub fn process_frame(
        &mut self,
        frame: &AudioFrame,
    ) -> Result<Vec<SegmenterEvent>, PipelineError> {
        let mut events = vec![SegmenterEvent::Level(frame.level)];
        let active = frame.level > self.config.silence_threshold;
        let frame_start = self.clock;
        self.clock += frame.duration.as_secs_f64();

        match (self.state, active) {
            (SegmenterState::Idle, true) => {
                self.state = SegmenterState::Speaking;
                self.started_at = frame_start;
                self.active_end = self.clock;
                self.silence = Duration::ZERO;
                self.buffer.clear();
                self.buffer.extend_from_slice(&frame.samples);
                events.push(SegmenterEvent::SpeechStart { at: frame_start });
            },

            (SegmenterState::Idle, false) => {},

            (SegmenterState::Speaking, true) | (SegmenterState::Trailing, true) => {
                // Any active frame cancels the pending silence hold.
                self.state = SegmenterState::Speaking;
                self.silence = Duration::ZERO;
                self.active_end = self.clock;
                self.buffer.extend_from_slice(&frame.samples);
            },

            (SegmenterState::Speaking, false) | (SegmenterState::Trailing, false) => {
                self.state = SegmenterState::Trailing;
                self.silence += frame.duration;
                self.buffer.extend_from_slice(&frame.samples);

                if self.silence >= self.config.silence_hold {
                    self.finalize(&mut events)?;
                }
            },
        }

        Ok(events)
    }

    /// Flush on stop: an open utterance is evaluated immediately instead of
    /// waiting for the silence hold.
    pub fn finish(&mut self) -> Result<Vec<SegmenterEvent>, PipelineError> {
        let mut events = Vec::new();
        if self.state != SegmenterState::Idle {
            self.finalize(&mut events)?;
        }
        Ok(events)
    }

    /// Drop any in-progress utterance and return to idle.
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.silence = Duration::ZERO;
        self.buffer.clear();
    }

    fn finalize(&mut self, events: &mut Vec<SegmenterEvent>) -> Result<(), PipelineError> {
        let speech_duration = Duration::from_secs_f64((self.active_end - self.started_at).max(0.0));

        if speech_duration >= self.config.min_speech {
            // Trim trailing silence so the segment matches the active run's
            // bounds.
            let active_samples =
                (speech_duration.as_secs_f64() * self.config.sample_rate as f64) as usize;
            let trimmed = &self.buffer[..active_samples.min(self.buffer.len())];

            let segment = AudioSegment::from_samples(
                trimmed,
                self.config.sample_rate,
                self.started_at,
                speech_duration,
            )
            .map_err(|e| PipelineError::Encode(e.to_string()))?;

            events.push(SegmenterEvent::SpeechEnd {
                at: self.active_end,
            });
            events.push(SegmenterEvent::Segment(segment));
        } else {
            events.push(SegmenterEvent::Discarded {
                duration: speech_duration,
            });
        }

        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescoach_core::AudioFrame;

    const SAMPLE_RATE: u32 = 16000;
    const FRAME_MS: u64 = 50;

    fn frame(level: f32, sequence: u64) -> AudioFrame {
        let samples = (SAMPLE_RATE as u64 * FRAME_MS / 1000) as usize;
        AudioFrame::new(vec![level; samples], SAMPLE_RATE, sequence)
    }

    fn active_frame(sequence: u64) -> AudioFrame {
        frame(0.3, sequence)
    }

    fn silent_frame(sequence: u64) -> AudioFrame {
        frame(0.0, sequence)
    }

    fn run(segmenter: &mut Segmenter, frames: &[AudioFrame]) -> Vec<SegmenterEvent> {
        let mut events = Vec::new();
        for f in frames {
            events.extend(segmenter.process_frame(f).unwrap());
        }
        events
    }

    fn count_starts(events: &[SegmenterEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SegmenterEvent::SpeechStart { .. }))
            .count()
    }

    fn count_ends(events: &[SegmenterEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SegmenterEvent::SpeechEnd { .. }))
            .count()
    }

    fn segments(events: &[SegmenterEvent]) -> Vec<&AudioSegment> {
        events
            .iter()
            .filter_map(|e| match e {
                SegmenterEvent::Segment(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_utterance_emits_one_segment() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        // 500ms silence, 1000ms speech, 1500ms silence
        let mut frames: Vec<AudioFrame> = Vec::new();
        let mut seq = 0;
        for _ in 0..10 {
            frames.push(silent_frame(seq));
            seq += 1;
        }
        for _ in 0..20 {
            frames.push(active_frame(seq));
            seq += 1;
        }
        for _ in 0..30 {
            frames.push(silent_frame(seq));
            seq += 1;
        }

        let events = run(&mut segmenter, &frames);

        assert_eq!(count_starts(&events), 1);
        assert_eq!(count_ends(&events), 1);

        let segs = segments(&events);
        assert_eq!(segs.len(), 1);
        // Segment bounds match the active run: started at 0.5s, 1.0s long.
        assert!((segs[0].started_at - 0.5).abs() < 1e-6);
        assert!((segs[0].duration.as_secs_f64() - 1.0).abs() < 1e-6);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_short_run_discarded_as_noise() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        // 200ms speech (below the 500ms minimum), then enough silence
        let mut frames: Vec<AudioFrame> = Vec::new();
        let mut seq = 0;
        for _ in 0..4 {
            frames.push(active_frame(seq));
            seq += 1;
        }
        for _ in 0..30 {
            frames.push(silent_frame(seq));
            seq += 1;
        }

        let events = run(&mut segmenter, &frames);

        assert_eq!(count_starts(&events), 1);
        assert_eq!(count_ends(&events), 0);
        assert!(segments(&events).is_empty());
        assert!(events
            .iter()
            .any(|e| matches!(e, SegmenterEvent::Discarded { .. })));
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_embedded_gap_does_not_split() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        // speech 600ms, silence 500ms (below the 1500ms hold), speech 600ms,
        // then silence past the hold
        let mut frames: Vec<AudioFrame> = Vec::new();
        let mut seq = 0;
        for _ in 0..12 {
            frames.push(active_frame(seq));
            seq += 1;
        }
        for _ in 0..10 {
            frames.push(silent_frame(seq));
            seq += 1;
        }
        for _ in 0..12 {
            frames.push(active_frame(seq));
            seq += 1;
        }
        for _ in 0..30 {
            frames.push(silent_frame(seq));
            seq += 1;
        }

        let events = run(&mut segmenter, &frames);

        assert_eq!(count_starts(&events), 1);
        assert_eq!(count_ends(&events), 1);
        let segs = segments(&events);
        assert_eq!(segs.len(), 1);
        // One segment spanning both runs and the embedded gap: 1.7s.
        assert!((segs[0].duration.as_secs_f64() - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_active_frame_cancels_pending_hold() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        for i in 0..12 {
            segmenter.process_frame(&active_frame(i)).unwrap();
        }
        // 1400ms of silence: just under the hold
        for i in 12..40 {
            segmenter.process_frame(&silent_frame(i)).unwrap();
        }
        assert_eq!(segmenter.state(), SegmenterState::Trailing);

        // Speech resumes; the hold timer is cancelled
        let events = segmenter.process_frame(&active_frame(40)).unwrap();
        assert_eq!(segmenter.state(), SegmenterState::Speaking);
        assert_eq!(count_starts(&events), 0);
        assert_eq!(count_ends(&events), 0);
    }

    #[test]
    fn test_immediate_stop_below_minimum() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        // 200ms of active signal, then immediate stop
        for i in 0..4 {
            segmenter.process_frame(&active_frame(i)).unwrap();
        }
        let events = segmenter.finish().unwrap();

        assert!(segments(&events).is_empty());
        assert!(events
            .iter()
            .any(|e| matches!(e, SegmenterEvent::Discarded { .. })));
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_level_reported_every_frame() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());

        let events = run(&mut segmenter, &[silent_frame(0), active_frame(1)]);
        let levels: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                SegmenterEvent::Level(l) => Some(*l),
                _ => None,
            })
            .collect();

        assert_eq!(levels.len(), 2);
        assert!(levels[0] < 0.02);
        assert!(levels[1] > 0.02);
    }

    #[test]
    fn test_pure_silence_produces_no_speech_events() {
        let mut segmenter = Segmenter::new(SegmenterConfig::default());
        let frames: Vec<AudioFrame> = (0..50).map(silent_frame).collect();

        let events = run(&mut segmenter, &frames);
        assert_eq!(count_starts(&events), 0);
        assert_eq!(count_ends(&events), 0);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }
}
