//! HTTP transport for multi-session mode.
//!
//! Endpoints:
//!
//! - `POST /sessions` — connection establishment; answers the new session id
//! - `POST /sessions/{id}/messages` — submits one JSON-RPC frame to that
//!   session; answers the JSON-RPC response body (or 202 for notifications)
//! - `DELETE /sessions/{id}` — explicit close; idempotent
//! - `GET /health` — the health snapshot, 200 when healthy, 503 otherwise
//!
//! An unknown or closed session id answers 404 with a protocol error
//! envelope; it never crashes the process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::mcp::protocol::JsonRpcError;
use crate::mcp::session::SessionManager;

/// Builds the HTTP application router.
#[must_use]
pub fn app(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(close_session))
        .route("/sessions/{id}/messages", post(submit_message))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

/// Serves the HTTP transport until a shutdown signal arrives, then drains
/// every active session.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn serve(manager: Arc<SessionManager>, bind: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "HTTP transport listening");

    let app = app(Arc::clone(&manager));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(signal) => signal,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            return std::future::pending().await;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, initiating graceful shutdown");
    }
}

/// `POST /sessions` — accepts a connection and answers its session id.
async fn create_session(State(manager): State<Arc<SessionManager>>) -> Response {
    let session = manager.open_session();
    (
        StatusCode::CREATED,
        Json(json!({
            "sessionId": session.id,
            "createdAt": session.created_at,
        })),
    )
        .into_response()
}

/// `DELETE /sessions/{id}` — idempotent close.
async fn close_session(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Response {
    if let Ok(session_id) = Uuid::parse_str(&id) {
        manager.close_session(session_id);
    }
    StatusCode::NO_CONTENT.into_response()
}

/// `POST /sessions/{id}/messages` — routes one frame to the session.
async fn submit_message(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    let Ok(session_id) = Uuid::parse_str(&id) else {
        manager.record_connection_error();
        return session_not_found_response(&id);
    };

    match manager.submit(session_id, &body).await {
        Ok(Some(response)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(_) => session_not_found_response(&id),
    }
}

fn session_not_found_response(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(JsonRpcError::session_not_found(id)),
    )
        .into_response()
}

/// `GET /health` — liveness probe with a 200/503 split on the derived
/// health boolean.
async fn health(State(manager): State<Arc<SessionManager>>) -> Response {
    let snapshot = manager.health_snapshot();
    let status = if snapshot.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(snapshot)).into_response()
}
