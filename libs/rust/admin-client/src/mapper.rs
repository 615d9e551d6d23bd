//! Conversion of transport outcomes into envelopes or [`ClientError`].
//!
//! Unauthorized results keep code 401 so the pipeline can route them to the
//! refresh protocol instead of treating them as ordinary failures.

use crate::envelope::ResponseEnvelope;
use crate::error::{ClientError, ClientResult};
use crate::status::{self, ApiStatus, NETWORK_ERROR_MESSAGE, REQUEST_FAILED_MESSAGE};
use crate::transport::{TransportError, TransportResponse};
use serde_json::Value;

/// Map a raw response to a success envelope or an error.
///
/// # Errors
///
/// Returns a [`ClientError`] for non-2xx statuses, undecodable bodies and
/// envelopes whose code is not success.
pub fn map_response(response: &TransportResponse) -> ClientResult<ResponseEnvelope<Value>> {
    if !response.is_success() {
        // Servers often still send an envelope alongside the status.
        if let Ok(envelope) = serde_json::from_slice::<ResponseEnvelope<Value>>(&response.body) {
            if !envelope.msg.is_empty() && envelope.code == i64::from(response.status) {
                return Err(from_envelope(&envelope));
            }
        }
        return Err(from_status(response.status));
    }

    let envelope: ResponseEnvelope<Value> =
        serde_json::from_slice(&response.body).map_err(ClientError::malformed_response)?;

    if envelope.is_success() {
        Ok(envelope)
    } else {
        Err(from_envelope(&envelope))
    }
}

/// Map a failure where no response was received.
#[must_use]
pub fn map_transport_error(error: &TransportError) -> ClientError {
    match error {
        TransportError::Timeout(_) => ClientError::new(
            ApiStatus::RequestTimeout.default_message(),
            ApiStatus::RequestTimeout.code(),
        ),
        TransportError::Connect(_) => {
            ClientError::new(NETWORK_ERROR_MESSAGE, ApiStatus::ServiceUnavailable.code())
        }
        TransportError::Other(detail) => ClientError::new(
            format!("{REQUEST_FAILED_MESSAGE}: {detail}"),
            ApiStatus::Error.code(),
        ),
    }
}

/// Error for a business failure reported inside an envelope.
#[must_use]
pub fn from_envelope<T>(envelope: &ResponseEnvelope<T>) -> ClientError {
    if envelope.is_unauthorized() {
        return ClientError::unauthorized(envelope.msg.clone());
    }
    let message = if envelope.msg.is_empty() {
        REQUEST_FAILED_MESSAGE.to_string()
    } else {
        envelope.msg.clone()
    };
    ClientError::new(message, envelope.code)
}

/// Error for a bare HTTP status.
#[must_use]
pub fn from_status(status: u16) -> ClientError {
    let code = i64::from(status);
    ClientError::new(status::message_for_code(code), code)
}
