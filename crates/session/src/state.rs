//! The session reducer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use salescoach_core::{
    CoachSuggestion, ComplianceViolation, Phase, SessionState, SessionStatus, Speaker,
    TranscriptEntry,
};

/// Actions accepted by the session state machine.
///
/// Every mutation of session state goes through one of these; no component
/// holds a writable reference to the collections themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    SetStatus { status: SessionStatus },
    AppendTranscript { entry: TranscriptEntry },
    AddSuggestion { suggestion: CoachSuggestion },
    /// Mark a suggestion dismissed; the record stays for the session log
    DismissSuggestion { id: Uuid },
    AddViolation { violation: ComplianceViolation },
    /// Remove a violation card by id
    DismissViolation { id: Uuid },
    /// Move the phase forward; backward requests are ignored
    AdvancePhase { to: Phase },
    /// Explicit external override, the one sanctioned way backward
    OverridePhase { to: Phase },
    UpdateElapsed { seconds: f64 },
    /// Accumulate uninterrupted counterpart speaking time
    CounterpartSpeaking { seconds: f64 },
    /// End the session cleanly (terminal)
    End,
    /// Move to the error status, preserving the message (terminal)
    Fail { message: String },
}

/// Apply one action to a session state.
///
/// Pure: no I/O, no clocks, no side effects. Terminal states (`ended`,
/// `error`) absorb every action unchanged.
pub fn reduce(mut state: SessionState, action: SessionAction) -> SessionState {
    if state.status.is_terminal() {
        return state;
    }

    match action {
        SessionAction::SetStatus { status } => {
            state.status = status;
        },

        SessionAction::AppendTranscript { mut entry } => {
            // Transcript timestamps are non-decreasing; entries arrive in
            // completion order, so a stray early timestamp is clamped
            // rather than reordered.
            if let Some(last) = state.transcript.last() {
                if entry.timestamp < last.timestamp {
                    entry.timestamp = last.timestamp;
                }
            }

            if entry.speaker == Speaker::Trainee {
                state.counterpart_speaking_secs = 0.0;
                state.last_trainee_speech_secs = Some(state.elapsed_seconds);
            }

            state.transcript.push(entry);
        },

        SessionAction::AddSuggestion { suggestion } => {
            state.coach_suggestions.push(suggestion);
        },

        SessionAction::DismissSuggestion { id } => {
            if let Some(s) = state.coach_suggestions.iter_mut().find(|s| s.id == id) {
                s.dismissed = true;
            }
        },

        SessionAction::AddViolation { violation } => {
            state.compliance_violations.push(violation);
        },

        SessionAction::DismissViolation { id } => {
            state.compliance_violations.retain(|v| v.id != id);
        },

        SessionAction::AdvancePhase { to } => {
            if to.index() >= state.current_phase.index() {
                state.current_phase = to;
            }
        },

        SessionAction::OverridePhase { to } => {
            state.current_phase = to;
        },

        SessionAction::UpdateElapsed { seconds } => {
            if seconds > state.elapsed_seconds {
                state.elapsed_seconds = seconds;
            }
        },

        SessionAction::CounterpartSpeaking { seconds } => {
            state.counterpart_speaking_secs += seconds;
        },

        SessionAction::End => {
            state.status = SessionStatus::Ended;
        },

        SessionAction::Fail { message } => {
            state.status = SessionStatus::Error;
            state.error_message = Some(message);
        },
    }

    state
}
