//! Process-wide upstream call accounting.
//!
//! Counters accumulate monotonically for the process lifetime; only the
//! last-error record and rate-limit fields are overwritten. The published
//! average latency is recomputed from the rolling window of the most recent
//! samples each time one is recorded, not maintained as a cumulative mean.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of latency samples retained for the rolling average.
pub const LATENCY_WINDOW: usize = 50;

/// The most recent upstream failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    /// Error message.
    pub message: String,
    /// When the failure happened.
    pub timestamp: DateTime<Utc>,
    /// The endpoint that failed.
    pub endpoint: String,
}

/// Aggregated statistics for calls to the Figma API.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    /// Total calls attempted, success or failure.
    pub total_calls: u64,

    /// Calls that ended in an error.
    pub failed_calls: u64,

    /// Mean latency over the most recent [`LATENCY_WINDOW`] samples, in
    /// milliseconds.
    pub average_latency_ms: f64,

    /// Last-seen `x-ratelimit-remaining` header value.
    pub rate_limit_remaining: Option<u64>,

    /// Last-seen `x-ratelimit-reset` header value (seconds).
    pub rate_limit_reset: Option<u64>,

    /// The most recent failure, if any.
    pub last_error: Option<LastError>,

    /// Rolling latency window backing `average_latency_ms`.
    #[serde(skip)]
    recent_latencies_ms: VecDeque<u64>,
}

impl ApiStats {
    /// Creates an empty statistics aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed call.
    ///
    /// `failed` covers transport failures, non-2xx statuses and malformed
    /// response bodies alike.
    pub fn record_call(&mut self, latency_ms: u64, failed: bool) {
        self.total_calls += 1;
        if failed {
            self.failed_calls += 1;
        }

        if self.recent_latencies_ms.len() == LATENCY_WINDOW {
            self.recent_latencies_ms.pop_front();
        }
        self.recent_latencies_ms.push_back(latency_ms);

        // Overwrite with the mean of the current window only.
        #[allow(clippy::cast_precision_loss)]
        {
            let sum: u64 = self.recent_latencies_ms.iter().sum();
            self.average_latency_ms = sum as f64 / self.recent_latencies_ms.len() as f64;
        }
    }

    /// Updates the last-known rate-limit headroom.
    pub fn record_rate_limit(&mut self, remaining: Option<u64>, reset: Option<u64>) {
        if remaining.is_some() {
            self.rate_limit_remaining = remaining;
        }
        if reset.is_some() {
            self.rate_limit_reset = reset;
        }
    }

    /// Overwrites the last-error record.
    pub fn record_error(&mut self, endpoint: &str, message: &str) {
        self.last_error = Some(LastError {
            message: message.to_string(),
            timestamp: Utc::now(),
            endpoint: endpoint.to_string(),
        });
    }
}

/// Statistics for tool invocations at the dispatcher boundary.
///
/// Distinct from [`ApiStats`]: one tool invocation may issue zero or many
/// upstream calls.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Total tool invocations.
    pub total_invocations: u64,

    /// Invocations whose result was not an error.
    pub succeeded: u64,

    /// Invocations whose result was an error.
    pub failed: u64,

    /// Mean invocation latency over the most recent window, in milliseconds.
    pub average_latency_ms: f64,

    /// Largest resident set size observed at an invocation boundary, bytes.
    /// Zero where the platform offers no cheap way to read it.
    pub peak_rss_bytes: u64,

    #[serde(skip)]
    recent_latencies_ms: VecDeque<u64>,
}

impl DispatchStats {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished invocation.
    pub fn record(&mut self, latency_ms: u64, succeeded: bool) {
        self.total_invocations += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        if self.recent_latencies_ms.len() == LATENCY_WINDOW {
            self.recent_latencies_ms.pop_front();
        }
        self.recent_latencies_ms.push_back(latency_ms);

        #[allow(clippy::cast_precision_loss)]
        {
            let sum: u64 = self.recent_latencies_ms.iter().sum();
            self.average_latency_ms = sum as f64 / self.recent_latencies_ms.len() as f64;
        }

        let rss = current_rss_bytes();
        if rss > self.peak_rss_bytes {
            self.peak_rss_bytes = rss;
        }
    }
}

/// Resident set size of this process in bytes, or 0 when unknown.
#[must_use]
pub fn current_rss_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        // /proc/self/statm: size resident shared text lib data dt (pages)
        if let Ok(statm) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(resident) = statm.split_whitespace().nth(1) {
                if let Ok(pages) = resident.parse::<u64>() {
                    return pages * 4096;
                }
            }
        }
        0
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}
