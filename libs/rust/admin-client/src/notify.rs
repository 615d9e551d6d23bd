//! Notification sink collaborator.
//!
//! The client decides when a message should reach the user; the sink decides
//! how it is rendered.

use crate::error::ClientError;
use tracing::{error, info};

/// Receives user-facing outcomes of requests.
pub trait Notifier: Send + Sync {
    /// Report a failure. `visible` is false when the caller asked for the
    /// failure not to be displayed; sinks should still record it.
    fn show_error(&self, error: &ClientError, visible: bool);

    /// Report a server supplied success message.
    fn show_success(&self, message: &str);
}

/// Notifier that emits structured tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_error(&self, err: &ClientError, visible: bool) {
        error!(
            code = err.code,
            method = err.method.as_deref().unwrap_or("-"),
            url = err.url.as_deref().unwrap_or("-"),
            visible,
            "{}",
            err.message
        );
    }

    fn show_success(&self, message: &str) {
        info!(message, "request succeeded");
    }
}
