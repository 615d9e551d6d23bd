//! The `{ code, msg, data }` wrapper every admin endpoint responds with.

use crate::status::ApiStatus;
use serde::{Deserialize, Serialize};

/// Uniform response envelope.
///
/// `code` follows [`ApiStatus`] numbering; `data` is absent or `null` on
/// failures and on endpoints that return nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Business code
    pub code: i64,
    /// Server supplied message
    #[serde(default, alias = "message")]
    pub msg: String,
    /// Payload
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    /// Build a success envelope around `data`.
    pub fn success(data: T) -> Self {
        Self {
            code: ApiStatus::Success.code(),
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Build a failure envelope with no payload.
    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    /// Whether the server reported success.
    pub const fn is_success(&self) -> bool {
        self.code == ApiStatus::Success.code()
    }

    /// Whether the server reported an unauthorized caller.
    pub const fn is_unauthorized(&self) -> bool {
        self.code == ApiStatus::Unauthorized.code()
    }
}
