//! MCP protocol endpoint and the single-session stdio server.
//!
//! Each client connection gets its own [`McpEndpoint`]: an isolated JSON-RPC
//! state machine covering the MCP lifecycle:
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: tool listing and tool calls
//! 3. **Shutdown**: graceful connection termination
//!
//! Endpoints share nothing with each other except the [`ToolRouter`] (and,
//! through it, the process-wide cache and statistics). The dispatch path is
//! identical whether one endpoint exists (stdio mode) or many (HTTP mode).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION,
    SERVER_NAME,
};
use crate::mcp::session::SessionManager;
use crate::mcp::tools::{ToolCallResult, ToolRouter};
use crate::mcp::transport::{ByteStreamTransport, StdioTransport};

/// Endpoint state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// One connection's JSON-RPC state machine.
pub struct McpEndpoint {
    state: ServerState,
    protocol_version: Option<String>,
    router: Arc<ToolRouter>,
}

impl McpEndpoint {
    /// Creates a fresh endpoint bound to the shared tool router.
    #[must_use]
    pub fn new(router: Arc<ToolRouter>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            protocol_version: None,
            router,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Handles one inbound frame and returns the serialised response, if the
    /// frame warrants one (notifications do not).
    ///
    /// Malformed frames yield a protocol error envelope; they never
    /// propagate.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => {
                let serialised = match self.handle_request(req).await {
                    Ok(response) => serde_json::to_string(&response),
                    Err(error) => serde_json::to_string(&error),
                };
                Some(serialised.unwrap_or_else(|_| fallback_internal_error()))
            }
            Ok(IncomingMessage::Notification(ref notif)) => {
                self.handle_notification(notif);
                None
            }
            Err(error) => {
                Some(serde_json::to_string(&error).unwrap_or_else(|_| fallback_internal_error()))
            }
        }
    }

    async fn handle_request(
        &mut self,
        req: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            "ping" => Ok(Self::handle_ping(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            self.state = ServerState::Running;
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let _params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": self.router.definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    async fn handle_tools_call(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result: ToolCallResult = self.router.invoke(&params.name, &params.arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InternalError,
                    "Internal error: failed to serialise result",
                ),
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

fn fallback_internal_error() -> String {
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#.to_string()
}

/// The single-session server: one endpoint bound to a duplex byte stream
/// for the process lifetime.
pub struct McpServer<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    transport: ByteStreamTransport<R, W>,
    manager: Arc<SessionManager>,
    session_id: uuid::Uuid,
}

impl McpServer {
    /// Creates a stdio-bound server and registers its single session.
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self::with_transport(manager, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary duplex pair (used by tests).
    #[must_use]
    pub fn with_transport(manager: Arc<SessionManager>, transport: ByteStreamTransport<R, W>) -> Self {
        let session = manager.open_session();
        Self {
            transport,
            manager,
            session_id: session.id,
        }
    }

    /// Runs the server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let result = self.run_with_shutdown().await;
        self.manager.shutdown().await;
        result
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` when the peer closed the connection.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        // The session was opened by this server and is closed only during
        // shutdown, so submission cannot miss.
        match self.manager.submit(self.session_id, &line).await {
            Ok(Some(response)) => self.transport.write_line(&response).await?,
            Ok(None) => {}
            Err(_) => {
                let envelope = JsonRpcError::session_not_found(&self.session_id.to_string());
                let serialised = serde_json::to_string(&envelope)
                    .unwrap_or_else(|_| fallback_internal_error());
                self.transport.write_line(&serialised).await?;
            }
        }

        Ok(false)
    }
}
