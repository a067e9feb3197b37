//! MCP server for OmniFocus automation.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: `initialize` moves the session from uninitialised
//!    to initialised, exactly once
//! 2. **Operation**: `tools/list` and `tools/call` are served
//! 3. **Shutdown**: `shutdown`, end of input or a termination signal
//!
//! Requests are handled strictly one at a time: a line is read, handled
//! (including any automation script it triggers) and answered before the
//! next line is read.
//!
//! | Phase          | initialize  | tools/list | tools/call | shutdown  | other     |
//! |----------------|-------------|------------|------------|-----------|-----------|
//! | uninitialised  | initialise  | error      | error      | terminate | not found |
//! | initialised    | error       | list       | dispatch   | terminate | not found |

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::automation::AutomationBackend;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::session::{ClientInfo, Session, SessionPhase};
use crate::mcp::transport::{InboundLine, LineTransport, StdioTransport};
use crate::tools::{Dispatcher, ToolRegistry};

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

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
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

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client capabilities. Must be present, may be empty.
    pub capabilities: Map<String, Value>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// The MCP server for OmniFocus.
pub struct McpServer<B> {
    /// Handshake state for this process.
    session: Session,
    /// Tool registry plus the backend tool calls run on.
    dispatcher: Dispatcher<B>,
}

impl<B: AutomationBackend> McpServer<B> {
    /// Creates a server exposing every tool on the given backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_registry(ToolRegistry::new(), backend)
    }

    /// Creates a server exposing the tools in `registry`.
    #[must_use]
    pub fn with_registry(registry: ToolRegistry, backend: B) -> Self {
        Self {
            session: Session::new(),
            dispatcher: Dispatcher::new(registry, backend),
        }
    }

    /// Returns the session state.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the server over stdio with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut transport = StdioTransport::stdio();
        self.run_with_shutdown(&mut transport).await
    }

    /// Runs the main loop until shutdown, end of input or a signal.
    #[cfg(unix)]
    async fn run_with_shutdown<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                Ok(())
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                Ok(())
            }

            result = self.serve(transport) => result,
        }
    }

    /// Runs the main loop until shutdown, end of input or Ctrl+C.
    #[cfg(windows)]
    async fn run_with_shutdown<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                Ok(())
            }

            result = self.serve(transport) => result,
        }
    }

    /// Serves requests from `transport` until shutdown or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails.
    pub async fn serve<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(inbound) = transport.read_line().await? {
            let line = match inbound {
                InboundLine::Text(line) => line,
                InboundLine::NotUtf8 => {
                    warn!("Discarding line that is not valid UTF-8");
                    transport
                        .write_message(&JsonRpcError::parse_error().into())
                        .await?;
                    continue;
                }
                InboundLine::TooLong { limit } => {
                    warn!(limit, "Discarding line longer than the limit");
                    transport
                        .write_message(&JsonRpcError::parse_error().into())
                        .await?;
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            trace!(line = %line, "Received");

            if let Some(reply) = self.handle_line(&line).await {
                transport.write_message(&reply).await?;
            }

            if self.session.phase() == SessionPhase::ShutDown {
                info!("Shutdown requested, stopping");
                return Ok(());
            }
        }

        info!("Input closed, stopping");
        Ok(())
    }

    /// Handles one raw input line.
    ///
    /// Returns the reply to write, or `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<OutgoingMessage> {
        match parse_message(line) {
            Ok(msg) => {
                trace!(method = msg.method(), is_request = msg.id().is_some(), "Parsed message");
                self.handle_message(msg).await
            }
            Err(error) => {
                warn!(
                    code = error.error.code,
                    message = %error.error.message,
                    "Discarding malformed message"
                );
                Some(error.into())
            }
        }
    }

    /// Handles a parsed incoming message.
    pub async fn handle_message(&mut self, msg: IncomingMessage) -> Option<OutgoingMessage> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                None
            }
        }
    }

    /// Handles an incoming request. Every failure becomes a JSON-RPC error.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> OutgoingMessage {
        debug!(method = %req.method, id = %req.id, "Handling request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "initialized" | "notifications/initialized" => self.handle_initialized_ack(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            "ping" => self.handle_ping(&req),
            "shutdown" => Ok(self.handle_shutdown(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => resp.into(),
            Err(error) => {
                info!(
                    method = %req.method,
                    code = error.error.code,
                    message = %error.error.message,
                    "Request failed"
                );
                error.into()
            }
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "initialized" | "notifications/initialized" => {
                if self.session.is_initialised() {
                    info!("Client confirmed initialisation");
                } else {
                    warn!("Ignoring initialized notification before initialize");
                }
            }
            "shutdown" => {
                info!("Shutdown notification received");
                self.session.shut_down();
            }
            other => {
                debug!(method = other, has_params = notif.params.is_some(), "Ignoring notification");
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.session.phase() != SessionPhase::Uninitialised {
            return Err(JsonRpcError::internal_error(
                req.id.clone(),
                "Server already initialized",
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::internal_error(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::internal_error(req.id.clone(), "Missing initialize params")
            })?;

        info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            client_version = params
                .client_info
                .as_ref()
                .and_then(|c| c.version.as_deref())
                .unwrap_or("unknown"),
            requested_version = params.protocol_version.as_deref().unwrap_or("unspecified"),
            "Client initialising"
        );

        self.session.initialise(
            params.capabilities,
            params.client_info,
            params.protocol_version,
        );

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Acknowledges an `initialized` message that was sent with an ID.
    fn handle_initialized_ack(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialised(&req.id)?;
        info!("Client confirmed initialisation");
        Ok(JsonRpcResponse::success(req.id.clone(), Value::Null))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialised(&req.id)?;

        let tools: Vec<_> = self.dispatcher.registry().iter().collect();

        let result = json!({
            "tools": tools,
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialised(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::internal_error(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::internal_error(req.id.clone(), "Missing tool call params")
            })?;

        info!(tool = %params.name, "Calling tool");

        let result = self
            .dispatcher
            .dispatch(&params.name, &params.arguments)
            .await;

        if result.is_error {
            warn!(
                tool = %params.name,
                message = result.first_text().unwrap_or_default(),
                "Tool call returned an error"
            );
        }

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialised(&req.id)?;
        Ok(JsonRpcResponse::success(req.id.clone(), json!({})))
    }

    /// Handles the shutdown request. Valid in every phase.
    fn handle_shutdown(&mut self, req: &JsonRpcRequest) -> JsonRpcResponse {
        info!("Shutdown requested by client");
        self.session.shut_down();
        JsonRpcResponse::success(req.id.clone(), Value::Null)
    }

    /// Ensures the handshake has completed.
    fn require_initialised(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if !self.session.is_initialised() {
            return Err(JsonRpcError::internal_error(
                id.clone(),
                "Server not initialized",
            ));
        }
        Ok(())
    }
}
