//! Counterpart connection controller

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use salescoach_core::{CounterpartEvent, CounterpartProvider, TokenIssuer};

use crate::TransportError;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    /// Trainee audio is being routed to the counterpart
    Listening,
    /// Counterpart speech is in flight
    Speaking,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Listening => "listening",
            ConnectionState::Speaking => "speaking",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

struct Shared {
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<CounterpartEvent>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }
}

/// Drives the lifecycle of one remote counterpart connection.
///
/// `idle → connecting → connected ⇄ {listening, speaking} → disconnected`,
/// with `error` reachable from the live states. Starting a second
/// connection tears down the first.
pub struct CounterpartController {
    provider: Arc<dyn CounterpartProvider>,
    tokens: Arc<dyn TokenIssuer>,
    shared: Arc<Shared>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl CounterpartController {
    pub fn new(provider: Arc<dyn CounterpartProvider>, tokens: Arc<dyn TokenIssuer>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            provider,
            tokens,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Idle),
                events,
            }),
            forwarder: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Controller-level event stream: provider events re-broadcast, plus
    /// errors the controller itself surfaces.
    pub fn subscribe(&self) -> broadcast::Receiver<CounterpartEvent> {
        self.shared.events.subscribe()
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Listening
                | ConnectionState::Speaking
        )
    }

    /// Exchange a token and bring the connection up.
    ///
    /// Token and connection failures move the controller to `error` and are
    /// reported on the event stream as well as returned.
    pub async fn connect(&self) -> Result<(), TransportError> {
        // Exactly one connection is live per session.
        if self.is_live() {
            tracing::info!("tearing down previous counterpart connection");
            self.end_session().await;
        }

        self.shared.set_state(ConnectionState::Connecting);

        let token = match self.tokens.issue().await {
            Ok(token) if !token.is_expired() => token,
            Ok(_) => {
                return Err(self.fail_connect("issued token already expired"));
            },
            Err(e) => {
                return Err(self.fail_connect(&e.to_string()));
            },
        };

        if let Err(e) = self.provider.connect(&token).await {
            return Err(self.fail_connect(&e.to_string()));
        }

        self.shared.set_state(ConnectionState::Connected);
        let _ = self.shared.events.send(CounterpartEvent::Connected);
        self.spawn_forwarder();

        Ok(())
    }

    fn fail_connect(&self, message: &str) -> TransportError {
        tracing::error!("counterpart connection failed: {}", message);
        self.shared.set_state(ConnectionState::Error);
        let _ = self
            .shared
            .events
            .send(CounterpartEvent::Error(message.to_string()));
        TransportError::Connection(message.to_string())
    }

    /// Re-broadcast provider events and track speaking/listening state.
    fn spawn_forwarder(&self) {
        let mut provider_events = self.provider.subscribe();
        let shared = self.shared.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = match provider_events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("counterpart event stream lagged, missed {} events", n);
                        continue;
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                match &event {
                    CounterpartEvent::SpeakingStarted => {
                        shared.set_state(ConnectionState::Speaking)
                    },
                    CounterpartEvent::SpeakingEnded | CounterpartEvent::Interrupted => {
                        shared.set_state(ConnectionState::Connected)
                    },
                    CounterpartEvent::ListeningStarted => {
                        shared.set_state(ConnectionState::Listening)
                    },
                    CounterpartEvent::ListeningStopped => {
                        shared.set_state(ConnectionState::Connected)
                    },
                    CounterpartEvent::Error(message) => {
                        tracing::error!("counterpart provider error: {}", message);
                        shared.set_state(ConnectionState::Error);
                    },
                    CounterpartEvent::Disconnected => {
                        shared.set_state(ConnectionState::Disconnected)
                    },
                    CounterpartEvent::Connected => {},
                }

                let _ = shared.events.send(event);
            }
        });

        if let Some(previous) = self.forwarder.lock().replace(handle) {
            previous.abort();
        }
    }

    fn require_live(&self, operation: &'static str) -> Result<(), TransportError> {
        if matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Listening | ConnectionState::Speaking
        ) {
            Ok(())
        } else {
            Err(TransportError::NotConnected {
                operation,
                state: self.state().to_string(),
            })
        }
    }

    /// Have the counterpart speak.
    pub async fn speak(&self, text: &str) -> Result<(), TransportError> {
        self.require_live("speak")?;
        self.provider
            .speak(text)
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))?;
        self.shared.set_state(ConnectionState::Speaking);
        Ok(())
    }

    /// Start routing trainee audio to the counterpart.
    pub async fn start_voice_chat(&self) -> Result<(), TransportError> {
        self.require_live("start_voice_chat")?;
        self.provider
            .start_listening()
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))?;
        self.shared.set_state(ConnectionState::Listening);
        Ok(())
    }

    /// Stop routing trainee audio.
    pub async fn stop_voice_chat(&self) -> Result<(), TransportError> {
        self.require_live("stop_voice_chat")?;
        self.provider
            .stop_listening()
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))?;
        self.shared.set_state(ConnectionState::Connected);
        Ok(())
    }

    /// Cancel in-flight counterpart speech immediately. Used when the
    /// trainee begins talking over the counterpart.
    pub async fn interrupt(&self) -> Result<(), TransportError> {
        self.require_live("interrupt")?;
        self.provider
            .interrupt()
            .await
            .map_err(|e| TransportError::Remote(e.to_string()))?;
        if self.state() == ConnectionState::Speaking {
            self.shared.set_state(ConnectionState::Connected);
        }
        Ok(())
    }

    /// Tear everything down, best-effort.
    ///
    /// Local resources are released and the controller lands in
    /// `disconnected` even when the remote call fails.
    pub async fn end_session(&self) {
        if let Err(e) = self.provider.disconnect().await {
            tracing::warn!("remote disconnect failed during teardown: {}", e);
        }

        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }

        self.shared.set_state(ConnectionState::Disconnected);
        let _ = self.shared.events.send(CounterpartEvent::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use salescoach_core::{Error, Result, SessionToken};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        connect: AtomicUsize,
        speak: AtomicUsize,
        interrupt: AtomicUsize,
        disconnect: AtomicUsize,
    }

    struct MockProvider {
        calls: Arc<Calls>,
        events: broadcast::Sender<CounterpartEvent>,
        fail_disconnect: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                calls: Arc::new(Calls::default()),
                events,
                fail_disconnect: false,
            }
        }

        fn failing_disconnect() -> Self {
            Self {
                fail_disconnect: true,
                ..Self::new()
            }
        }

        fn emit(&self, event: CounterpartEvent) {
            let _ = self.events.send(event);
        }
    }

    #[async_trait]
    impl CounterpartProvider for MockProvider {
        async fn connect(&self, _token: &SessionToken) -> Result<()> {
            self.calls.connect.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn speak(&self, _text: &str) -> Result<()> {
            self.calls.speak.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn start_listening(&self) -> Result<()> {
            Ok(())
        }

        async fn stop_listening(&self) -> Result<()> {
            Ok(())
        }

        async fn interrupt(&self) -> Result<()> {
            self.calls.interrupt.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(Error::RemoteService("remote hung up badly".into()));
            }
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<CounterpartEvent> {
            self.events.subscribe()
        }
    }

    struct MockIssuer {
        fail: bool,
        issued: AtomicUsize,
    }

    impl MockIssuer {
        fn new() -> Self {
            Self {
                fail: false,
                issued: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                issued: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenIssuer for MockIssuer {
        async fn issue(&self) -> Result<SessionToken> {
            self.issued.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::RemoteService("token endpoint returned 401".into()));
            }
            Ok(SessionToken::new("tok-1", Utc::now() + Duration::minutes(10)))
        }
    }

    fn controller_with(
        provider: MockProvider,
        issuer: MockIssuer,
    ) -> (CounterpartController, Arc<Calls>) {
        let calls = provider.calls.clone();
        (
            CounterpartController::new(Arc::new(provider), Arc::new(issuer)),
            calls,
        )
    }

    #[tokio::test]
    async fn test_connect_reaches_connected() {
        let (controller, calls) = controller_with(MockProvider::new(), MockIssuer::new());

        controller.connect().await.unwrap();

        assert_eq!(controller.state(), ConnectionState::Connected);
        assert_eq!(calls.connect.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_failure_reported_not_thrown() {
        let (controller, calls) = controller_with(MockProvider::new(), MockIssuer::failing());
        let mut events = controller.subscribe();

        let result = controller.connect().await;

        assert!(matches!(result, Err(TransportError::Connection(_))));
        assert_eq!(controller.state(), ConnectionState::Error);
        assert_eq!(calls.connect.load(Ordering::SeqCst), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            CounterpartEvent::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_second_connect_tears_down_first() {
        let (controller, calls) = controller_with(MockProvider::new(), MockIssuer::new());

        controller.connect().await.unwrap();
        controller.connect().await.unwrap();

        assert_eq!(calls.connect.load(Ordering::SeqCst), 2);
        assert_eq!(calls.disconnect.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_speak_requires_connection() {
        let (controller, calls) = controller_with(MockProvider::new(), MockIssuer::new());

        let result = controller.speak("hello there").await;
        assert!(matches!(result, Err(TransportError::NotConnected { .. })));
        assert_eq!(calls.speak.load(Ordering::SeqCst), 0);

        controller.connect().await.unwrap();
        controller.speak("hello there").await.unwrap();
        assert_eq!(controller.state(), ConnectionState::Speaking);
    }

    #[tokio::test]
    async fn test_interrupt_cancels_speech() {
        let (controller, calls) = controller_with(MockProvider::new(), MockIssuer::new());

        controller.connect().await.unwrap();
        controller.speak("a very long monologue").await.unwrap();
        assert_eq!(controller.state(), ConnectionState::Speaking);

        controller.interrupt().await.unwrap();
        assert_eq!(calls.interrupt.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_voice_chat_toggles_listening() {
        let (controller, _calls) = controller_with(MockProvider::new(), MockIssuer::new());

        controller.connect().await.unwrap();
        controller.start_voice_chat().await.unwrap();
        assert_eq!(controller.state(), ConnectionState::Listening);

        controller.stop_voice_chat().await.unwrap();
        assert_eq!(controller.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_teardown_is_best_effort() {
        let (controller, calls) =
            controller_with(MockProvider::failing_disconnect(), MockIssuer::new());

        controller.connect().await.unwrap();
        controller.end_session().await;

        // The remote call failed, local teardown still completed.
        assert_eq!(calls.disconnect.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_provider_events_tracked_and_rebroadcast() {
        let provider = MockProvider::new();
        let emitter = provider.events.clone();
        let (controller, _calls) = controller_with(provider, MockIssuer::new());

        controller.connect().await.unwrap();
        let mut events = controller.subscribe();

        let _ = emitter.send(CounterpartEvent::SpeakingStarted);

        // Wait for the forwarder to re-broadcast, then check tracked state.
        loop {
            if let CounterpartEvent::SpeakingStarted = events.recv().await.unwrap() {
                break;
            }
        }
        assert_eq!(controller.state(), ConnectionState::Speaking);
    }
}
