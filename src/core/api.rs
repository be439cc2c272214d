//! HTTP + WebSocket API for Henshin
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /simulate - Run a fitting simulation (stateless)
//! - POST /protocol/new - Create a protocol session
//! - GET /protocol/{id} - Session status
//! - POST /protocol/{id}/transition - Advance one state
//! - POST /protocol/{id}/refuse - Refuse with a code
//! - POST /protocol/{id}/happy-path - Walk the whole chain
//! - GET /protocol/{id}/log - Deposition log (text)
//! - WS /ws/{id} - Live protocol events
//!
//! One machine per session. Mutations hold the write lock, so a session's
//! transitions are serialized.

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::{broadcast, broadcast::error::RecvError, RwLock};
use tracing::{debug, info, warn};

use crate::core::{
    generate_session_id, is_valid_session_id, log_digest, render_deposition_log,
    save_audit_bundle, ProtocolStateMachine, SequenceInput,
};
use crate::types::{
    AuditStatus, ConfigError, ProtocolError, ProtocolEvent, ProtocolState, SimulationResult,
};

/// Protocol session
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub machine: ProtocolStateMachine,
    pub update_tx: broadcast::Sender<ProtocolEvent>,
}

impl Session {
    fn publish(&self, event: &ProtocolEvent) {
        // no subscribers is fine
        let _ = self.update_tx.send(event.clone());
    }
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    /// Where terminal sessions write their audit bundle
    pub audit_dir: Option<PathBuf>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub current_state: ProtocolState,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub current_state: ProtocolState,
    pub event_count: usize,
    pub audit: AuditStatus,
    pub terminal: bool,
    pub log_sha256: String,
}

/// Transition request
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to_state: String,
    #[serde(default)]
    pub note: String,
}

/// Refusal request
#[derive(Debug, Deserialize)]
pub struct RefuseRequest {
    pub code: String,
    #[serde(default)]
    pub note: String,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<ProtocolState>,
}

/// Failures surfaced by the API
#[derive(Debug)]
pub enum ApiError {
    BadSessionId(String),
    SessionNotFound(String),
    Protocol { error: ProtocolError, current_state: ProtocolState },
    Config(ConfigError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadSessionId(id) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: format!("malformed session id: {}", id),
                    code: "R601_BAD_SESSION_ID".to_string(),
                    current_state: None,
                },
            ),
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: format!("session not found: {}", id),
                    code: "R602_SESSION_NOT_FOUND".to_string(),
                    current_state: None,
                },
            ),
            ApiError::Protocol { error, current_state } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error.to_string(),
                    code: error.code().to_string(),
                    current_state: Some(current_state),
                },
            ),
            ApiError::Config(error) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: error.to_string(),
                    code: error.code().to_string(),
                    current_state: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router
pub fn create_router(audit_dir: Option<PathBuf>) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        audit_dir,
    });

    Router::new()
        .route("/health", get(health))
        .route("/simulate", post(simulate))
        .route("/protocol/new", post(create_session))
        .route("/protocol/:id", get(get_session))
        .route("/protocol/:id/transition", post(transition))
        .route("/protocol/:id/refuse", post(refuse))
        .route("/protocol/:id/happy-path", post(happy_path))
        .route("/protocol/:id/log", get(get_log))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

fn check_id(id: &str) -> Result<(), ApiError> {
    if is_valid_session_id(id) {
        Ok(())
    } else {
        Err(ApiError::BadSessionId(id.to_string()))
    }
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Run a simulation document
async fn simulate(Json(input): Json<SequenceInput>) -> Result<Json<SimulationResult>, ApiError> {
    let result = input.run().map_err(ApiError::Config)?;
    info!(frames = result.frames.len(), equip_frame = result.equip_frame, "simulation served");
    Ok(Json(result))
}

/// Create new protocol session
async fn create_session(State(state): State<Arc<AppState>>) -> Json<NewSessionResponse> {
    let mut sessions = state.sessions.write().await;
    let mut session_id = generate_session_id(Utc::now());
    while sessions.contains_key(&session_id) {
        session_id = generate_session_id(Utc::now());
    }

    let (tx, _) = broadcast::channel(100);
    let session = Session {
        id: session_id.clone(),
        machine: ProtocolStateMachine::new(),
        update_tx: tx,
    };
    let current_state = session.machine.state();
    sessions.insert(session_id.clone(), session);
    info!(session = %session_id, "protocol session created");

    Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        current_state,
    })
}

fn status_of(session: &Session) -> SessionStatusResponse {
    SessionStatusResponse {
        session_id: session.id.clone(),
        current_state: session.machine.state(),
        event_count: session.machine.event_count(),
        audit: session.machine.audit_status(),
        terminal: session.machine.is_terminal(),
        log_sha256: log_digest(&session.machine),
    }
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    check_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(status_of(session)))
}

/// Apply `op` to a session's machine under the write lock and publish the
/// new events. A session that became terminal is archived after the lock is
/// released.
async fn mutate<F>(state: &AppState, id: String, op: F) -> Result<Vec<ProtocolEvent>, ApiError>
where
    F: FnOnce(&mut ProtocolStateMachine) -> Result<Vec<ProtocolEvent>, ProtocolError>,
{
    check_id(&id)?;
    let (events, finished) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;

        let events = op(&mut session.machine).map_err(|error| {
            warn!(session = %session.id, code = error.code(), "protocol call rejected");
            ApiError::Protocol { error, current_state: session.machine.state() }
        })?;

        for event in &events {
            session.publish(event);
        }

        let finished = session
            .machine
            .is_terminal()
            .then(|| (session.id.clone(), session.machine.clone()));
        (events, finished)
    };

    if let (Some(dir), Some((session_id, machine))) = (state.audit_dir.clone(), finished) {
        archive(dir, session_id, machine).await;
    }
    Ok(events)
}

/// Write the audit bundle of a finished session on the blocking pool
async fn archive(dir: PathBuf, session_id: String, machine: ProtocolStateMachine) {
    let id = session_id.clone();
    let saved = tokio::task::spawn_blocking(move || save_audit_bundle(&dir, &id, &machine)).await;
    match saved {
        Ok(Ok(bundle)) => info!(session = %session_id, path = %bundle.deposition_log.display(), "audit bundle saved"),
        Ok(Err(e)) => warn!(session = %session_id, error = %e, "audit bundle save failed"),
        Err(e) => warn!(session = %session_id, error = %e, "audit bundle task failed"),
    }
}

/// Advance one state
async fn transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<ProtocolEvent>, ApiError> {
    let mut events = mutate(&state, id, |machine| {
        let to_state: ProtocolState = req.to_state.parse()?;
        machine.transition(to_state, &req.note).map(|e| vec![e])
    })
    .await?;
    // mutate returns exactly the one appended event
    Ok(Json(events.remove(0)))
}

/// Refuse with a code
async fn refuse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RefuseRequest>,
) -> Result<Json<ProtocolEvent>, ApiError> {
    let mut events = mutate(&state, id, |machine| {
        machine.refuse(&req.code, &req.note).map(|e| vec![e])
    })
    .await?;
    Ok(Json(events.remove(0)))
}

/// Walk the whole chain
async fn happy_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProtocolEvent>>, ApiError> {
    let events = mutate(&state, id, |machine| machine.run_happy_path()).await?;
    Ok(Json(events))
}

/// Deposition log as plain text
async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    let log = render_deposition_log(&session.machine);
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], log))
}

/// WebSocket handler for live events
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    check_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Next event for a subscriber; a slow subscriber skips what it missed.
/// `None` once the session's sender is gone.
async fn next_event(rx: &mut broadcast::Receiver<ProtocolEvent>) -> Option<ProtocolEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "websocket subscriber lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Forward events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<ProtocolEvent>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = next_event(&mut rx).await {
            let json = serde_json::to_string(&event).unwrap_or_default();
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, audit_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(audit_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "henshin API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
