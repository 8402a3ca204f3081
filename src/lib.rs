//! figma-variables-mcp: MCP server for Figma files, projects and
//! design-token variables.
//!
//! This library exposes the Figma REST API as a set of schema-described
//! tools over JSON-RPC 2.0, serving one session over stdio or many over
//! HTTP.
//!
//! # Architecture
//!
//! - **Upstream access**: one authenticated client in front of the Figma
//!   API, with a bounded time-expiring response cache and process-wide call
//!   statistics
//! - **Reference validation**: a dependency graph built from alias
//!   references between variables, checked for cycles and dangling targets
//! - **Dispatch**: a lookup table mapping tool name to schema and handler,
//!   with centralised argument validation
//! - **Sessions**: a registry of isolated per-connection protocol
//!   endpoints, with periodic health snapshots
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Configuration and startup error types
//! - [`figma`] — Figma REST client, cache and statistics
//! - [`graph`] — Variable-reference graph validation
//! - [`mcp`] — MCP protocol implementation and transports

pub mod config;
pub mod error;
pub mod figma;
pub mod graph;
pub mod mcp;
