//! Status codes shared by response envelopes and the HTTP transport.
//!
//! The admin API reuses HTTP status numbers inside its `{ code, msg, data }`
//! envelope, so a single table covers both business codes and transport
//! statuses.

/// Codes the client distinguishes explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiStatus {
    /// Request succeeded
    Success,
    /// Generic request failure
    Error,
    /// Credential missing, expired or rejected
    Unauthorized,
    /// Authenticated but not allowed
    Forbidden,
    /// Resource not found
    NotFound,
    /// Method not allowed
    MethodNotAllowed,
    /// Request timed out
    RequestTimeout,
    /// Internal server error
    InternalServerError,
    /// Not implemented
    NotImplemented,
    /// Bad gateway
    BadGateway,
    /// Service unavailable
    ServiceUnavailable,
    /// Gateway timeout
    GatewayTimeout,
}

/// Codes RetryPolicy is allowed to retry.
pub const TRANSIENT_STATUSES: [ApiStatus; 5] = [
    ApiStatus::RequestTimeout,
    ApiStatus::InternalServerError,
    ApiStatus::BadGateway,
    ApiStatus::ServiceUnavailable,
    ApiStatus::GatewayTimeout,
];

/// Message used when no better message is available.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";

/// Message used when the request never reached the server.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error, please check your connection";

impl ApiStatus {
    /// Numeric code as carried by envelopes and HTTP responses.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Success => 200,
            Self::Error => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::RequestTimeout => 408,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }

    /// Look up a known status by its numeric code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            200 => Some(Self::Success),
            400 => Some(Self::Error),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            405 => Some(Self::MethodNotAllowed),
            408 => Some(Self::RequestTimeout),
            500 => Some(Self::InternalServerError),
            501 => Some(Self::NotImplemented),
            502 => Some(Self::BadGateway),
            503 => Some(Self::ServiceUnavailable),
            504 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }

    /// Whether a failure with this status may succeed when re-issued.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RequestTimeout
                | Self::InternalServerError
                | Self::BadGateway
                | Self::ServiceUnavailable
                | Self::GatewayTimeout
        )
    }

    /// Human message shown when the server gave none.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Bad request",
            Self::Unauthorized => "Session expired, please sign in again",
            Self::Forbidden => "Access forbidden",
            Self::NotFound => "Requested resource not found",
            Self::MethodNotAllowed => "Request method not allowed",
            Self::RequestTimeout => "Request timed out",
            Self::InternalServerError => "Internal server error",
            Self::NotImplemented => "Service not implemented",
            Self::BadGateway => "Bad gateway",
            Self::ServiceUnavailable => "Service unavailable",
            Self::GatewayTimeout => "Gateway timed out",
        }
    }
}

/// Whether `code` is on the retry allow-list.
#[must_use]
pub fn is_transient_code(code: i64) -> bool {
    ApiStatus::from_code(code).is_some_and(ApiStatus::is_transient)
}

/// Default message for an arbitrary numeric code.
#[must_use]
pub fn message_for_code(code: i64) -> &'static str {
    match ApiStatus::from_code(code) {
        Some(status) => status.default_message(),
        None => REQUEST_FAILED_MESSAGE,
    }
}
