//! Transport seam between the client pipeline and the network.
//!
//! The pipeline only ever talks to a [`Transport`]. Production code uses
//! [`crate::http::ReqwestTransport`]; tests substitute scripted transports.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use thiserror::Error;
use url::Url;

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including query string
    pub url: Url,
    /// Outgoing headers
    pub headers: HeaderMap,
    /// Encoded body, if any
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as JSON, if present and parseable.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// Raw response handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create a response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failures where no HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The per-call timeout elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server could not be reached
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be sent or the response not read
    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// The underlying request executor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response.
    async fn execute(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::json(200, &json!({})).is_success());
        assert!(TransportResponse::json(204, &json!({})).is_success());
        assert!(!TransportResponse::json(401, &json!({})).is_success());
        assert!(!TransportResponse::json(503, &json!({})).is_success());
    }

    #[test]
    fn test_prepared_request_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "T1".parse().unwrap());
        let request = PreparedRequest {
            method: Method::POST,
            url: Url::parse("http://localhost/api/v1/members").unwrap(),
            headers,
            body: Some(br#"{"name":"Ada"}"#.to_vec()),
        };

        assert_eq!(request.header("Authorization"), Some("T1"));
        assert_eq!(request.json_body(), Some(json!({ "name": "Ada" })));
    }
}
