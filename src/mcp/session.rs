//! Session registry, process state and health reporting.
//!
//! The [`SessionManager`] exclusively owns the active-session registry. A
//! session is created when a connection is established and destroyed when
//! the connection closes; destruction removes it from the registry and
//! releases its endpoint. Sessions are isolated: one session's failures
//! never affect another's ability to process requests, while the response
//! cache and statistics stay process-wide through the shared
//! [`ToolRouter`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::figma::stats::{ApiStats, DispatchStats};
use crate::mcp::server::McpEndpoint;
use crate::mcp::tools::ToolRouter;

/// Recorded connection errors at or above this threshold mark the process
/// unhealthy.
pub const CONNECTION_ERROR_THRESHOLD: u32 = 5;

/// Interval between health snapshot publications.
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(10);

/// Coarse process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Construction finished, transports not yet accepting.
    Starting,
    /// Accepting and serving connections.
    Running,
    /// Shutdown requested, draining sessions.
    Stopping,
    /// All sessions closed, nothing accepted any more.
    Stopped,
    /// Unrecoverable startup or transport failure.
    Error,
}

/// A point-in-time view of process health.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Process lifecycle state.
    pub state: ProcessState,
    /// Derived health: running and below the connection-error threshold.
    pub healthy: bool,
    /// Seconds since process start.
    pub uptime_seconds: u64,
    /// Seconds since the last inbound activity.
    pub seconds_since_last_activity: u64,
    /// Recorded connection errors.
    pub connection_errors: u32,
    /// Sessions currently registered.
    pub active_sessions: usize,
    /// Upstream call statistics.
    pub api: ApiStats,
    /// Tool dispatch statistics.
    pub dispatch: DispatchStats,
}

/// One client connection.
pub struct Session {
    /// Opaque session identifier, generated at connection time.
    pub id: Uuid,
    /// When the connection was accepted.
    pub created_at: DateTime<Utc>,
    /// The session's protocol endpoint. Locked for the duration of each
    /// dispatched frame, so shutdown can await in-flight work.
    pub endpoint: tokio::sync::Mutex<McpEndpoint>,
}

/// Submission target did not exist (unknown or already closed session).
#[derive(Debug, Error)]
#[error("session not found: {0}")]
pub struct UnknownSession(pub Uuid);

/// Owns the active sessions and the process health state.
pub struct SessionManager {
    router: Arc<ToolRouter>,
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
    state: Mutex<ProcessState>,
    started_at: Instant,
    last_activity: Mutex<Instant>,
    connection_errors: Mutex<u32>,
    health_tx: broadcast::Sender<HealthSnapshot>,
}

impl SessionManager {
    /// Creates a manager in the `Starting` state.
    #[must_use]
    pub fn new(router: Arc<ToolRouter>) -> Arc<Self> {
        let (health_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            router,
            sessions: Mutex::new(HashMap::new()),
            state: Mutex::new(ProcessState::Starting),
            started_at: Instant::now(),
            last_activity: Mutex::new(Instant::now()),
            connection_errors: Mutex::new(0),
            health_tx,
        })
    }

    /// The shared tool router.
    #[must_use]
    pub fn router(&self) -> &Arc<ToolRouter> {
        &self.router
    }

    /// Current process state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ProcessState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Marks the process as serving.
    pub fn mark_running(&self) {
        self.set_state(ProcessState::Running);
    }

    /// Marks the process as failed.
    pub fn mark_error(&self) {
        self.set_state(ProcessState::Error);
    }

    /// Records inbound activity for the idle-seconds health field.
    pub fn record_activity(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Records one connection-level error (malformed submission target,
    /// transport accept failure).
    pub fn record_connection_error(&self) {
        let mut errors = self
            .connection_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *errors += 1;
        warn!(connection_errors = *errors, "connection error recorded");
    }

    /// Number of currently registered sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Accepts a connection: allocates a session id, builds a fresh endpoint
    /// bound to the shared router, and registers the session.
    #[must_use]
    pub fn open_session(&self) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            endpoint: tokio::sync::Mutex::new(McpEndpoint::new(Arc::clone(&self.router))),
        });

        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id, Arc::clone(&session));
        self.record_activity();

        info!(session_id = %session.id, "session opened");
        session
    }

    /// Removes a session from the registry. Idempotent: closing an unknown
    /// or already-closed session is a no-op.
    pub fn close_session(&self, id: Uuid) {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            info!(session_id = %id, "session closed");
        } else {
            debug!(session_id = %id, "close of unknown session ignored");
        }
    }

    /// Routes one inbound frame to the matching session's endpoint.
    ///
    /// Returns the serialised response, or `None` for notifications.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSession`] when the id is unknown or already closed;
    /// this also counts as a connection error.
    pub async fn submit(&self, id: Uuid, line: &str) -> Result<Option<String>, UnknownSession> {
        let session = {
            let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.get(&id).cloned()
        };

        let Some(session) = session else {
            self.record_connection_error();
            return Err(UnknownSession(id));
        };

        self.record_activity();
        let mut endpoint = session.endpoint.lock().await;
        Ok(endpoint.handle_line(line).await)
    }

    /// Closes every active session and stops accepting new ones.
    ///
    /// Close attempts run independently; a slow or wedged session delays
    /// only itself, and failures are logged, never propagated.
    pub async fn shutdown(&self) {
        if matches!(self.state(), ProcessState::Stopping | ProcessState::Stopped) {
            return;
        }
        self.set_state(ProcessState::Stopping);

        let drained: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.drain().map(|(_, session)| session).collect()
        };

        info!(count = drained.len(), "closing active sessions");
        for session in drained {
            // Await in-flight dispatch before releasing the endpoint.
            let _endpoint = session.endpoint.lock().await;
            debug!(session_id = %session.id, "session drained");
        }

        self.set_state(ProcessState::Stopped);
        info!("session manager stopped");
    }

    /// Computes the current health snapshot.
    #[must_use]
    pub fn health_snapshot(&self) -> HealthSnapshot {
        let state = self.state();
        let connection_errors = *self
            .connection_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let idle = self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed();

        HealthSnapshot {
            state,
            healthy: state == ProcessState::Running
                && connection_errors < CONNECTION_ERROR_THRESHOLD,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            seconds_since_last_activity: idle.as_secs(),
            connection_errors,
            active_sessions: self.active_sessions(),
            api: self.router.figma().stats_snapshot(),
            dispatch: self.router.dispatch_snapshot(),
        }
    }

    /// Subscribes to the periodic health snapshot feed.
    #[must_use]
    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthSnapshot> {
        self.health_tx.subscribe()
    }

    /// Spawns the fixed-interval health publisher.
    ///
    /// The task recomputes the snapshot every [`HEALTH_INTERVAL`] and
    /// publishes it to subscribers; it exits once the manager stops.
    pub fn spawn_health_publisher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if manager.state() == ProcessState::Stopped {
                    break;
                }
                let snapshot = manager.health_snapshot();
                debug!(
                    state = ?snapshot.state,
                    healthy = snapshot.healthy,
                    active_sessions = snapshot.active_sessions,
                    total_calls = snapshot.api.total_calls,
                    "health snapshot"
                );
                // No subscribers is fine; the send result only reflects that.
                let _ = manager.health_tx.send(snapshot);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figma::FigmaClient;

    fn test_manager() -> Arc<SessionManager> {
        let figma = Arc::new(FigmaClient::with_base_url(
            "figd_test".to_string(),
            "http://127.0.0.1:1".to_string(),
            10,
            Duration::from_secs(300),
        ));
        SessionManager::new(Arc::new(ToolRouter::new(figma)))
    }

    const INITIALIZE: &str =
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#;
    const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    const TOOLS_LIST: &str = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;

    async fn initialise(manager: &SessionManager, id: Uuid) {
        manager.submit(id, INITIALIZE).await.unwrap().unwrap();
        assert!(manager.submit(id, INITIALIZED).await.unwrap().is_none());
    }

    #[test]
    fn open_and_close_update_registry() {
        let manager = test_manager();
        assert_eq!(manager.active_sessions(), 0);

        let a = manager.open_session();
        let b = manager.open_session();
        assert_eq!(manager.active_sessions(), 2);
        assert_ne!(a.id, b.id);

        manager.close_session(a.id);
        assert_eq!(manager.active_sessions(), 1);

        // Idempotent: closing again never errors.
        manager.close_session(a.id);
        assert_eq!(manager.active_sessions(), 1);
    }

    #[tokio::test]
    async fn submit_to_unknown_session_is_a_connection_error() {
        let manager = test_manager();
        manager.mark_running();

        let missing = Uuid::new_v4();
        let err = manager.submit(missing, TOOLS_LIST).await.unwrap_err();
        assert_eq!(err.0, missing);
        assert_eq!(manager.health_snapshot().connection_errors, 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let manager = test_manager();
        manager.mark_running();

        let x = manager.open_session();
        let y = manager.open_session();
        initialise(&manager, x.id).await;
        initialise(&manager, y.id).await;

        // Closing X must not affect Y's ability to process requests.
        manager.close_session(x.id);
        let response = manager.submit(y.id, TOOLS_LIST).await.unwrap().unwrap();
        assert!(response.contains("get-file"));

        // X itself is gone.
        assert!(manager.submit(x.id, TOOLS_LIST).await.is_err());
    }

    #[tokio::test]
    async fn each_session_has_independent_lifecycle_state() {
        let manager = test_manager();
        manager.mark_running();

        let x = manager.open_session();
        let y = manager.open_session();
        initialise(&manager, x.id).await;

        // Y was never initialised; its endpoint must still be awaiting init.
        let response = manager.submit(y.id, TOOLS_LIST).await.unwrap().unwrap();
        assert!(response.contains("Server not initialised"));

        // X is unaffected.
        let response = manager.submit(x.id, TOOLS_LIST).await.unwrap().unwrap();
        assert!(response.contains("get-file"));
    }

    #[tokio::test]
    async fn health_turns_unhealthy_at_error_threshold() {
        let manager = test_manager();
        manager.mark_running();
        assert!(manager.health_snapshot().healthy);

        for _ in 0..6 {
            manager.record_connection_error();
        }

        let snapshot = manager.health_snapshot();
        assert_eq!(snapshot.state, ProcessState::Running);
        assert_eq!(snapshot.connection_errors, 6);
        assert!(!snapshot.healthy);
    }

    #[tokio::test]
    async fn health_requires_running_state() {
        let manager = test_manager();
        // Still Starting: not healthy even with zero errors.
        assert!(!manager.health_snapshot().healthy);
        manager.mark_running();
        assert!(manager.health_snapshot().healthy);
    }

    #[tokio::test]
    async fn shutdown_drains_sessions_and_stops() {
        let manager = test_manager();
        manager.mark_running();
        let _a = manager.open_session();
        let _b = manager.open_session();

        manager.shutdown().await;
        assert_eq!(manager.state(), ProcessState::Stopped);
        assert_eq!(manager.active_sessions(), 0);

        // Idempotent.
        manager.shutdown().await;
        assert_eq!(manager.state(), ProcessState::Stopped);
    }

    #[tokio::test]
    async fn health_snapshot_serialises_with_camel_case() {
        let manager = test_manager();
        manager.mark_running();
        let value = serde_json::to_value(manager.health_snapshot()).unwrap();
        assert_eq!(value["state"], "running");
        assert!(value["healthy"].as_bool().unwrap());
        assert!(value.get("activeSessions").is_some());
        assert!(value.get("connectionErrors").is_some());
        assert!(value["api"].get("totalCalls").is_some());
        assert!(value["dispatch"].get("totalInvocations").is_some());
    }

    #[tokio::test]
    async fn health_publisher_emits_snapshots() {
        let manager = test_manager();
        manager.mark_running();
        let mut feed = manager.subscribe_health();

        // The interval's first tick fires immediately, so the first
        // snapshot arrives without waiting out HEALTH_INTERVAL.
        let publisher = manager.spawn_health_publisher();
        let snapshot = feed.recv().await.unwrap();
        assert_eq!(snapshot.state, ProcessState::Running);

        publisher.abort();
    }
}
