//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes OmniFocus task operations as MCP tools. The server
//! communicates over stdio using line-delimited JSON-RPC 2.0 messages: one
//! message per line on stdin, one reply per line on stdout. Diagnostics go
//! to stderr only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│ Dispatcher  │     │
//! │   │   (stdio)   │    │  (session)  │    │   (tools)   │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                                     │            │
//! │          ▼                                     ▼            │
//! │   ┌──────────────────┐             ┌──────────────────┐     │
//! │   │ JSON-RPC Messages│             │ Automation script│     │
//! │   └──────────────────┘             └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation advertises MCP protocol version 2025-06-18.

pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use protocol::{
    IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage,
    MCP_PROTOCOL_VERSION,
};
pub use server::McpServer;
pub use session::{Session, SessionPhase};
pub use transport::{InboundLine, LineTransport, StdioTransport};
