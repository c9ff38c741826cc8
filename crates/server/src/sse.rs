//! SSE advisory channel endpoint
//!
//! One long-lived server→client stream per request. Opening the channel
//! spawns an advisory loop bound to the session; dropping the stream
//! (client navigation, abort) synchronously signals the loop's shutdown
//! watch before the channel closes, so no interval timer outlives a
//! torn-down channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use salescoach_advisor::{AdvisoryHandle, AdvisoryLoop};

use crate::state::AppState;

/// Shuts the advisory loop down when the SSE stream is dropped.
struct ChannelGuard {
    handle: Arc<AdvisoryHandle>,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        // Synchronous: the interval is cleared before the stream closes.
        self.handle.shutdown();
    }
}

/// GET /api/sessions/:id/coach
///
/// Events are JSON objects, one per `data:` line. The loop sends an
/// immediate heartbeat on open, then analyzes on its cadence. The sent-
/// suggestion dedup list lives on the session, so reconnects never replay
/// old suggestions.
pub async fn advisory_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    let advisory = AdvisoryLoop::new(
        session.machine.clone(),
        state.analyzer.clone(),
        session.sent.clone(),
        state.get_config().advisory.clone(),
    );
    let receiver = advisory.subscribe();
    let handle = Arc::new(advisory.spawn());

    // A new channel supersedes the previous one for this session.
    session.set_advisory(handle.clone());

    let guard = ChannelGuard { handle };
    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let _held = &guard;
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    tracing::warn!("failed to serialize advisory event: {}", e);
                    None
                },
            },
            Err(e) => {
                tracing::debug!("advisory stream error: {}", e);
                None
            },
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    ))
}
