//! Action queue around the pure reducer
//!
//! Actions are applied strictly one at a time; no two actions ever run
//! concurrently against the same state. Consumers read snapshots or watch
//! for changes; nobody touches the state directly.

use tokio::sync::{mpsc, oneshot, watch};

use salescoach_core::SessionState;

use crate::state::{reduce, SessionAction};
use crate::SessionError;

/// Queue depth before dispatchers are back-pressured
const ACTION_QUEUE_DEPTH: usize = 256;

enum Command {
    Action(SessionAction),
    /// Acknowledged once everything queued before it has been reduced
    Sync(oneshot::Sender<()>),
}

/// Handle to a running session state machine.
///
/// Cheap to clone; the processing task exits when every handle is dropped.
#[derive(Clone)]
pub struct SessionMachine {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionState>,
}

impl SessionMachine {
    /// Spawn the processing task over an initial state.
    pub fn spawn(initial: SessionState) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel::<Command>(ACTION_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());

        tokio::spawn(async move {
            let mut state = initial;
            while let Some(command) = command_rx.recv().await {
                match command {
                    Command::Action(action) => {
                        state = reduce(state, action);
                        let _ = snapshot_tx.send(state.clone());
                    },
                    Command::Sync(ack) => {
                        let _ = ack.send(());
                    },
                }
            }
            tracing::debug!(
                session_id = state.session_id.as_deref().unwrap_or("-"),
                "session machine drained"
            );
        });

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    /// Enqueue one action.
    pub async fn dispatch(&self, action: SessionAction) -> Result<(), SessionError> {
        self.commands
            .send(Command::Action(action))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.snapshots.borrow().clone()
    }

    /// Watch for state changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.snapshots.clone()
    }

    /// Wait until every action queued before this call has been applied.
    ///
    /// Dispatch then await this when a read must observe the write.
    pub async fn settled(&self) -> Result<(), SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Sync(ack_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        ack_rx.await.map_err(|_| SessionError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescoach_core::{Phase, SessionStatus, Speaker, TranscriptEntry};

    #[tokio::test]
    async fn test_actions_apply_in_order() {
        let machine = SessionMachine::spawn(SessionState::new("s1"));

        for i in 0..5 {
            machine
                .dispatch(SessionAction::AppendTranscript {
                    entry: TranscriptEntry::new(
                        Speaker::Trainee,
                        format!("turn {}", i),
                        i as f64,
                        Phase::Rapport,
                    ),
                })
                .await
                .unwrap();
        }
        machine.settled().await.unwrap();

        let state = machine.snapshot();
        assert_eq!(state.transcript.len(), 5);
        for (i, entry) in state.transcript.iter().enumerate() {
            assert_eq!(entry.content, format!("turn {}", i));
        }
    }

    #[tokio::test]
    async fn test_watchers_observe_changes() {
        let machine = SessionMachine::spawn(SessionState::new("s1"));
        let mut watcher = machine.watch();

        machine
            .dispatch(SessionAction::SetStatus {
                status: SessionStatus::Connected,
            })
            .await
            .unwrap();

        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow().status, SessionStatus::Connected);
    }

    #[tokio::test]
    async fn test_concurrent_dispatchers_never_lose_actions() {
        let machine = SessionMachine::spawn(SessionState::new("s1"));

        let mut tasks = Vec::new();
        for t in 0..4 {
            let machine = machine.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..25 {
                    machine
                        .dispatch(SessionAction::AppendTranscript {
                            entry: TranscriptEntry::new(
                                Speaker::Trainee,
                                format!("{}:{}", t, i),
                                0.0,
                                Phase::Rapport,
                            ),
                        })
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        machine.settled().await.unwrap();

        assert_eq!(machine.snapshot().transcript.len(), 100);
    }
}
