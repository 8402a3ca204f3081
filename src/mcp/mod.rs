//! MCP protocol implementation.
//!
//! This module contains the protocol layer of the server:
//!
//! - [`protocol`] — JSON-RPC 2.0 message types
//! - [`server`] — per-connection endpoint state machine and the stdio server
//! - [`tools`] — tool catalogue, argument validation and dispatch
//! - [`session`] — session registry, process state and health reporting
//! - [`transport`] — newline-delimited byte-stream transport (stdio)
//! - [`http`] — multi-session HTTP transport
//!
//! # Transport modes
//!
//! Exactly one transport is selected at startup: the stdio byte-stream
//! binding serves a single exclusive session for the process lifetime; the
//! HTTP binding serves any number of concurrent sessions, each with its own
//! endpoint. Dispatch is identical in both modes.

pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;
