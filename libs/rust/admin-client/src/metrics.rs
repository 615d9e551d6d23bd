//! Client counters with Prometheus text rendering.

use std::sync::atomic::{AtomicU64, Ordering};

/// A simple counter metric.
#[derive(Debug)]
pub struct Counter {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name,
            self.help,
            self.name,
            self.name,
            self.get()
        )
    }
}

/// Counters maintained by one client context.
#[derive(Debug)]
pub struct ClientMetrics {
    /// Calls handed to the transport, retries included
    pub requests_issued: Counter,
    /// Transient failures re-issued by the retry policy
    pub retries: Counter,
    /// Refresh exchanges sent to the server
    pub refresh_exchanges: Counter,
    /// Session-termination notices shown
    pub unauthorized_notices: Counter,
    /// Sign-outs scheduled after terminal unauthorized failures
    pub sign_outs: Counter,
}

impl ClientMetrics {
    /// Create new client metrics with the given prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            requests_issued: Counter::new(
                format!("{prefix}_requests_issued_total"),
                "Total number of requests handed to the transport",
            ),
            retries: Counter::new(
                format!("{prefix}_retries_total"),
                "Total number of transient failures retried",
            ),
            refresh_exchanges: Counter::new(
                format!("{prefix}_refresh_exchanges_total"),
                "Total number of credential refresh exchanges",
            ),
            unauthorized_notices: Counter::new(
                format!("{prefix}_unauthorized_notices_total"),
                "Total number of session termination notices shown",
            ),
            sign_outs: Counter::new(
                format!("{prefix}_sign_outs_total"),
                "Total number of sign-outs after terminal unauthorized failures",
            ),
        }
    }

    /// Format all metrics as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        [
            &self.requests_issued,
            &self.retries,
            &self.refresh_exchanges,
            &self.unauthorized_notices,
            &self.sign_outs,
        ]
        .iter()
        .map(|counter| counter.to_prometheus())
        .collect()
    }
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new("admin_client")
    }
}
