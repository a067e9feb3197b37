//! Per-process session state for the MCP handshake.
//!
//! One [`Session`] exists per server process. It starts out uninitialised,
//! is initialised exactly once by a successful `initialize` request and is
//! never reset.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the `initialize` request.
    Uninitialised,
    /// Handshake complete, tool calls accepted.
    Initialised,
    /// A `shutdown` request was answered; the loop stops after writing it.
    ShutDown,
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

/// Handshake state shared by every request in the process.
#[derive(Debug)]
pub struct Session {
    phase: SessionPhase,
    client_capabilities: Map<String, Value>,
    client_info: Option<ClientInfo>,
    requested_protocol_version: Option<String>,
}

impl Session {
    /// Creates an uninitialised session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialised,
            client_capabilities: Map::new(),
            client_info: None,
            requested_protocol_version: None,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the handshake has completed (and shutdown has not been requested).
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.phase == SessionPhase::Initialised
    }

    /// Capabilities the client declared in `initialize`.
    #[must_use]
    pub const fn client_capabilities(&self) -> &Map<String, Value> {
        &self.client_capabilities
    }

    /// Client identity, if the client sent one.
    #[must_use]
    pub const fn client_info(&self) -> Option<&ClientInfo> {
        self.client_info.as_ref()
    }

    /// Protocol version the client asked for, if any.
    #[must_use]
    pub fn requested_protocol_version(&self) -> Option<&str> {
        self.requested_protocol_version.as_deref()
    }

    /// Completes the handshake.
    ///
    /// Returns `false` (leaving the session untouched) if it was already
    /// initialised or shut down.
    pub fn initialise(
        &mut self,
        capabilities: Map<String, Value>,
        client_info: Option<ClientInfo>,
        requested_protocol_version: Option<String>,
    ) -> bool {
        if self.phase != SessionPhase::Uninitialised {
            return false;
        }
        self.client_capabilities = capabilities;
        self.client_info = client_info;
        self.requested_protocol_version = requested_protocol_version;
        self.phase = SessionPhase::Initialised;
        true
    }

    /// Marks the session as shut down. Valid from any phase.
    pub fn shut_down(&mut self) {
        self.phase = SessionPhase::ShutDown;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
