use super::state::AppState;
use crate::error::SessionError;
use crate::session::{SessionState, SessionStats, SessionView};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// Whether the request changed anything
    pub changed: bool,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub state: SessionState,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn start_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::AlreadyActive => StatusCode::CONFLICT,
        SessionError::Device(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Connection(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Open the channel, acquire devices and start recording
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested");

    if let Err(e) = state.controller.start().await {
        error!("Failed to start session: {}", e);
        return (
            start_error_status(&e),
            Json(ErrorResponse {
                error: format!("Failed to start session: {}", e),
            }),
        )
            .into_response();
    }

    let session_id = state.controller.session().await.map(|s| s.id);
    (
        StatusCode::OK,
        Json(SessionResponse {
            session_id,
            state: state.controller.state().await,
            message: "Session started".to_string(),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// End the session, uploading its recordings
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested");

    state.controller.end().await;
    let stats = state.controller.stats().await;

    (
        StatusCode::OK,
        Json(StopSessionResponse {
            state: stats.state,
            message: "Session ended".to_string(),
            stats,
        }),
    )
}

/// POST /session/turn/start
pub async fn start_turn(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.controller.begin_recording_turn().await;
    turn_response(&state, changed).await
}

/// POST /session/turn/stop
pub async fn stop_turn(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.controller.end_recording_turn().await;
    turn_response(&state, changed).await
}

async fn turn_response(state: &AppState, changed: bool) -> (StatusCode, Json<TurnResponse>) {
    (
        StatusCode::OK,
        Json(TurnResponse {
            changed,
            state: state.controller.state().await,
        }),
    )
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.controller.stats().await)
}

/// GET /session/view
pub async fn get_view(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.controller.view())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
