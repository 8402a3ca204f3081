//! Figma REST API access.
//!
//! This module owns everything that touches the upstream API:
//!
//! - [`client`] — authenticated HTTP access with response caching
//! - [`cache`] — bounded, time-expiring LRU response cache
//! - [`stats`] — process-wide call accounting
//! - [`types`] — typed views of the upstream payloads
//! - [`error`] — upstream error taxonomy
//!
//! The cache and statistics are exclusively owned by [`client::FigmaClient`];
//! nothing outside this module mutates them directly.

pub mod cache;
pub mod client;
pub mod error;
pub mod stats;
pub mod types;

pub use client::FigmaClient;
pub use error::UpstreamError;
