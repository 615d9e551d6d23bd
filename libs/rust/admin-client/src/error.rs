//! Error types surfaced by the client.
//!
//! Every request path converges on [`ClientError`]: a machine code (envelope
//! business code or transport status) plus a human message. Configuration
//! problems found while building a client use [`ConfigError`].

use crate::status::{self, ApiStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// The single error type returned to callers of the client.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{message} (code {code})")]
pub struct ClientError {
    /// Human readable message
    pub message: String,
    /// Envelope business code or transport status code
    pub code: i64,
    /// HTTP method of the failed request, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Resolved URL of the failed request, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    retry_exhausted: bool,
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Create an error with the given message and code.
    #[must_use]
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
            method: None,
            url: None,
            timestamp: Utc::now(),
            retry_exhausted: false,
        }
    }

    /// Create an unauthorized error, falling back to the default message
    /// when `message` is empty.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            ApiStatus::Unauthorized.default_message().to_string()
        } else {
            message
        };
        Self::new(message, ApiStatus::Unauthorized.code())
    }

    /// Create an error for a request that could not be built.
    #[must_use]
    pub fn request_config(detail: impl std::fmt::Display) -> Self {
        Self::new(
            format!("Request configuration error: {detail}"),
            ApiStatus::Error.code(),
        )
    }

    /// Create an error for a response body that could not be understood.
    #[must_use]
    pub fn malformed_response(detail: impl std::fmt::Display) -> Self {
        Self::new(
            format!("Malformed response: {detail}"),
            ApiStatus::Error.code(),
        )
    }

    /// Attach the method and URL of the request that failed.
    #[must_use]
    pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self
    }

    /// Check if the error signals a missing or rejected credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.code == ApiStatus::Unauthorized.code()
    }

    /// Check if the error is on the transient allow-list.
    ///
    /// # Examples
    ///
    /// ```
    /// use admin_client::ClientError;
    ///
    /// assert!(ClientError::new("upstream down", 503).is_transient());
    /// assert!(!ClientError::new("name is required", 400).is_transient());
    /// ```
    #[must_use]
    pub fn is_transient(&self) -> bool {
        status::is_transient_code(self.code)
    }

    /// Whether a retry sequence already gave up on this error.
    #[must_use]
    pub const fn is_retry_exhausted(&self) -> bool {
        self.retry_exhausted
    }

    pub(crate) fn exhausted(mut self) -> Self {
        self.retry_exhausted = true;
        self
    }
}

/// Errors raised while loading configuration or building a client.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment value could not be parsed
    #[error("Invalid {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: String,
        /// Parse failure description
        reason: String,
    },

    /// The base URL or a resolved request URL is not valid
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    /// Create an invalid value error for the named setting.
    #[must_use]
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ClientError::new("timeout", 408).is_transient());
        assert!(ClientError::new("boom", 500).is_transient());
        assert!(ClientError::new("gateway", 504).is_transient());
    }

    #[test]
    fn test_non_transient_errors() {
        assert!(!ClientError::new("validation", 400).is_transient());
        assert!(!ClientError::unauthorized("").is_transient());
        assert!(!ClientError::new("custom business failure", 1001).is_transient());
    }

    #[test]
    fn test_unauthorized_default_message() {
        let err = ClientError::unauthorized("");
        assert!(err.is_unauthorized());
        assert_eq!(err.message, ApiStatus::Unauthorized.default_message());

        let err = ClientError::unauthorized("token revoked");
        assert_eq!(err.message, "token revoked");
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::new("Member not found", 404);
        assert_eq!(err.to_string(), "Member not found (code 404)");

        let err = ConfigError::invalid_value("ADMIN_API_MAX_RETRIES", "invalid digit");
        assert_eq!(err.to_string(), "Invalid ADMIN_API_MAX_RETRIES: invalid digit");
    }

    #[test]
    fn test_request_context_serialized() {
        let err = ClientError::new("Bad gateway", 502).with_request("GET", "http://api/orders");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["url"], "http://api/orders");
        assert_eq!(value["code"], 502);
        assert!(value.get("retry_exhausted").is_none());
    }

    #[test]
    fn test_exhausted_marker() {
        let err = ClientError::new("timeout", 408);
        assert!(!err.is_retry_exhausted());
        assert!(err.exhausted().is_retry_exhausted());
    }
}
