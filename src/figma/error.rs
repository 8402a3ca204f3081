//! Upstream error taxonomy.
//!
//! Distinguishes "the request failed" from "the request succeeded but the
//! response body was not what we expected" — callers rephrase 403/404 into
//! user-facing messages via [`UpstreamError::describe`].

use thiserror::Error;

/// Errors raised by the Figma API client.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The caller passed an empty endpoint path.
    #[error("upstream endpoint must not be empty")]
    EmptyEndpoint,

    /// No API token is configured on the client.
    #[error("Figma API token is not configured")]
    MissingToken,

    /// An identifier failed the injection-safety check before being
    /// interpolated into an endpoint path.
    #[error("invalid {field}: identifiers may only contain letters, digits, ':', '_' and '-'")]
    InvalidIdentifier {
        /// Which identifier field was rejected.
        field: &'static str,
    },

    /// The HTTP request itself failed (DNS, connect, timeout...).
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// The endpoint that was being called.
        endpoint: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-2xx status.
    #[error("Figma API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Best-available error message from the response body.
        message: String,
    },

    /// The API answered 2xx but the body could not be decoded.
    #[error("malformed Figma response from {endpoint}: {detail}")]
    MalformedResponse {
        /// The endpoint that produced the response.
        endpoint: String,
        /// What went wrong while decoding.
        detail: String,
    },
}

impl UpstreamError {
    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rephrases this error for a tool result, naming the resource that was
    /// being accessed.
    ///
    /// The policy is uniform across every tool handler: 404 becomes a
    /// "not found" message naming the resource, 403 becomes a permissions
    /// message, everything else passes through with the upstream message
    /// appended.
    #[must_use]
    pub fn describe(&self, resource: &str) -> String {
        match self.status() {
            Some(404) => format!("Resource not found: {resource}"),
            Some(403) => format!(
                "Permission denied for {resource}: check that the configured token has access"
            ),
            _ => format!("Request for {resource} failed: {self}"),
        }
    }
}
