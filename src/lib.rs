//! omnifocus-gtd-mcp: MCP server for Getting Things Done with OmniFocus
//!
//! This library lets AI assistants capture, organise and review OmniFocus
//! tasks. Each MCP tool call is translated into a single run of an
//! automation script (AppleScript by default) that talks to OmniFocus.
//!
//! # Architecture
//!
//! The server handles protocol and argument plumbing. The scripts hold the
//! OmniFocus knowledge:
//!
//! - **Protocol**: JSON-RPC 2.0 over stdio with the MCP handshake
//! - **Tools**: A fixed catalog of GTD operations with typed parameters
//! - **Automation**: One interpreter process per tool call, with a timeout
//!
//! # Modules
//!
//! - [`automation`]: Running automation scripts
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Tool catalog and dispatch

pub mod automation;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
