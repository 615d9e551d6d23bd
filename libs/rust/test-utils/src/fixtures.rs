//! Envelope fixtures in the admin API's wire shape.

use admin_client::TransportResponse;
use serde_json::{Value, json};

/// Success envelope carrying `data`.
#[must_use]
pub fn success(data: Value) -> Value {
    json!({ "code": 200, "msg": "ok", "data": data })
}

/// Success envelope with a custom message.
#[must_use]
pub fn success_with_message(data: Value, msg: &str) -> Value {
    json!({ "code": 200, "msg": msg, "data": data })
}

/// Failure envelope with no payload.
#[must_use]
pub fn failure(code: i64, msg: &str) -> Value {
    json!({ "code": code, "msg": msg, "data": null })
}

/// Unauthorized envelope.
#[must_use]
pub fn unauthorized() -> Value {
    failure(401, "token expired")
}

/// Refresh success envelope.
#[must_use]
pub fn token_pair(token: &str, refresh_token: &str) -> Value {
    success(json!({ "token": token, "refreshToken": refresh_token }))
}

/// Sample profile for the current user endpoint.
#[must_use]
pub fn user_info() -> Value {
    json!({
        "userId": 1,
        "userName": "Super",
        "email": "super@example.com",
        "avatar": "",
        "roles": ["R_SUPER"],
        "buttons": ["B_CODE1", "B_CODE2"]
    })
}

/// 200 response wrapping `envelope`.
#[must_use]
pub fn ok(envelope: &Value) -> TransportResponse {
    TransportResponse::json(200, envelope)
}

/// Bare HTTP status with an empty body.
#[must_use]
pub fn status(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        body: Vec::new(),
    }
}

/// Sample member as returned by the members endpoints.
#[must_use]
pub fn member(id: u64, name: &str, phone: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "phone": phone,
        "channel": "store",
        "createdAt": "2024-05-01T10:00:00+08:00"
    })
}

/// Sample paid order as returned by the orders endpoints.
#[must_use]
pub fn paid_order(id: u64, member_id: u64, amount_cents: i64) -> Value {
    json!({
        "id": id,
        "orderNo": format!("ORD-{member_id}-{id}"),
        "memberId": member_id,
        "memberName": "Ada",
        "amountCents": amount_cents,
        "status": "paid",
        "source": "store",
        "paidAt": "2024-05-02T09:30:00Z",
        "createdAt": "2024-05-02T09:30:00Z"
    })
}
