//! HTTP endpoints
//!
//! REST surface for session lifecycle plus the SSE advisory channel. Every
//! mutation here goes through the session machine's action queue; handlers
//! never touch state directly.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use salescoach_core::{ComplianceViolation, Phase, Speaker, TranscriptEntry};
use salescoach_session::SessionAction;

use crate::sse;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    drop(config);

    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // State machine operations
        .route("/api/sessions/:id/utterances", post(append_utterance))
        .route("/api/sessions/:id/phase", post(advance_phase))
        .route("/api/sessions/:id/elapsed", post(update_elapsed))
        .route(
            "/api/sessions/:id/suggestions/:suggestion_id",
            delete(dismiss_suggestion),
        )
        .route(
            "/api/sessions/:id/violations/:violation_id",
            delete(dismiss_violation),
        )
        // Advisory channel (SSE)
        .route("/api/sessions/:id/coach", get(sse::advisory_channel))
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Create a session
async fn create_session(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let config = state.get_config().clone();
    let session = state
        .sessions
        .create(&config, Some(state.classifier.clone()))
        .map_err(StatusCode::from)?;

    let snapshot = session.machine.snapshot();
    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "status": snapshot.status.to_string(),
        "phase": snapshot.current_phase.to_string(),
    })))
}

/// Get session state
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = session.machine.snapshot();

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "active": session.is_active(),
        "status": snapshot.status.to_string(),
        "phase": snapshot.current_phase.to_string(),
        "elapsed_seconds": snapshot.elapsed_seconds,
        "transcript": snapshot.transcript,
        "coach_suggestions": snapshot.coach_suggestions,
        "compliance_violations": snapshot.compliance_violations,
        "error_message": snapshot.error_message,
    })))
}

/// List sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

/// End and remove a session
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if let Some(session) = state.sessions.get(&id) {
        let _ = session.machine.dispatch(SessionAction::End).await;
        let _ = session.machine.settled().await;
    }
    state.sessions.remove(&id);
    StatusCode::NO_CONTENT
}

/// Utterance request
#[derive(Debug, Deserialize)]
struct UtteranceRequest {
    speaker: Speaker,
    content: String,
    /// Seconds since session start
    timestamp: f64,
}

/// Utterance response
#[derive(Debug, Serialize)]
struct UtteranceResponse {
    index: usize,
    violations: Vec<ComplianceViolation>,
}

/// Append a transcript entry; trainee utterances are screened for
/// compliance before the response is returned.
async fn append_utterance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UtteranceRequest>,
) -> Result<Json<UtteranceResponse>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    let phase = session.machine.snapshot().current_phase;
    let entry = TranscriptEntry::new(request.speaker, request.content.clone(), request.timestamp, phase);

    session
        .machine
        .dispatch(SessionAction::AppendTranscript { entry })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    session
        .machine
        .settled()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let snapshot = session.machine.snapshot();
    let index = snapshot.transcript.len().saturating_sub(1);
    let timestamp = snapshot
        .transcript
        .last()
        .map(|e| e.timestamp)
        .unwrap_or(request.timestamp);

    let mut violations = Vec::new();
    if request.speaker == Speaker::Trainee {
        let mut detector = session.detector.lock().await;
        violations = detector.screen(index, &request.content, timestamp).await;
        drop(detector);

        for violation in &violations {
            session
                .machine
                .dispatch(SessionAction::AddViolation {
                    violation: violation.clone(),
                })
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        session
            .machine
            .settled()
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    Ok(Json(UtteranceResponse { index, violations }))
}

/// Phase change request
#[derive(Debug, Deserialize)]
struct PhaseRequest {
    phase: Phase,
    /// Explicit external override; the one way backward
    #[serde(default)]
    force: bool,
}

/// Advance (or override) the conversational phase
async fn advance_phase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PhaseRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    let action = if request.force {
        SessionAction::OverridePhase { to: request.phase }
    } else {
        SessionAction::AdvancePhase { to: request.phase }
    };

    session
        .machine
        .dispatch(action)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    session
        .machine
        .settled()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(serde_json::json!({
        "phase": session.machine.snapshot().current_phase.to_string(),
    })))
}

/// Elapsed time update
#[derive(Debug, Deserialize)]
struct ElapsedRequest {
    seconds: f64,
}

async fn update_elapsed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ElapsedRequest>,
) -> Result<StatusCode, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    session
        .machine
        .dispatch(SessionAction::UpdateElapsed {
            seconds: request.seconds,
        })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Dismiss a suggestion card
async fn dismiss_suggestion(
    State(state): State<AppState>,
    Path((id, suggestion_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    session
        .machine
        .dispatch(SessionAction::DismissSuggestion { id: suggestion_id })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Dismiss a violation card
async fn dismiss_violation(
    State(state): State<AppState>,
    Path((id, violation_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    session
        .machine
        .dispatch(SessionAction::DismissViolation { id: violation_id })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    session
        .machine
        .settled()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Health check
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.count(),
    }))
}
