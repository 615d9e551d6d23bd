//! Merchant operations endpoints: dashboard summary, members and orders.
//!
//! Creation calls pass their payload as request params; the gateway moves
//! them into the JSON body.

use crate::client::ApiClient;
use crate::error::ClientResult;
use crate::request::RequestDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Path of the dashboard summary endpoint.
pub const SUMMARY_PATH: &str = "/api/v1/summary";

/// Path of the members collection.
pub const MEMBERS_PATH: &str = "/api/v1/members";

/// Path of the orders collection.
pub const ORDERS_PATH: &str = "/api/v1/orders";

/// Dashboard totals.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summary {
    /// Registered members
    pub member_count: i64,
    /// Orders of any status
    pub order_count: i64,
    /// Orders in the paid status
    pub paid_order_count: i64,
    /// Revenue of paid orders, in cents
    pub revenue_cents: i64,
    /// Members with at least two paid orders
    pub repurchase_count: i64,
    /// Repurchase share of all members, as a percentage
    pub repurchase_rate: f64,
    /// Campaigns currently active
    pub active_campaign_count: i64,
    /// Members per acquisition channel
    pub channel_breakdown: Vec<ChannelCount>,
}

/// Member count for one acquisition channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCount {
    /// Channel name
    pub channel: String,
    /// Members acquired through it
    pub member_count: i64,
}

/// A merchant's customer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// Phone number, unique per merchant
    pub phone: String,
    /// Acquisition channel
    pub channel: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Paid
    Paid,
    /// Refunded after payment
    Refunded,
}

/// An order placed by a member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    pub id: u64,
    /// Merchant-facing order number
    pub order_no: String,
    /// Owning member
    pub member_id: u64,
    /// Owning member's name
    pub member_name: String,
    /// Amount in cents
    pub amount_cents: i64,
    /// Current status
    pub status: OrderStatus,
    /// Sales channel the order came from
    pub source: String,
    /// Payment time, absent unless paid
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Fields for a new member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberParams {
    /// Display name
    pub name: String,
    /// Phone number
    pub phone: String,
    /// Acquisition channel
    pub channel: String,
}

/// Fields for a new order.
///
/// The server generates an order number and defaults the status to paid
/// when they are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderParams {
    /// Merchant-facing order number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    /// Owning member
    pub member_id: u64,
    /// Amount in cents
    pub amount_cents: i64,
    /// Initial status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Sales channel
    pub source: String,
}

impl CreateOrderParams {
    /// A paid order for `member_id` with a server-generated number.
    #[must_use]
    pub fn new(member_id: u64, amount_cents: i64, source: impl Into<String>) -> Self {
        Self {
            order_no: None,
            member_id,
            amount_cents,
            status: None,
            source: source.into(),
        }
    }

    /// Use a caller-chosen order number.
    #[must_use]
    pub fn with_order_no(mut self, order_no: impl Into<String>) -> Self {
        self.order_no = Some(order_no.into());
        self
    }

    /// Create the order in `status` instead of paid.
    #[must_use]
    pub const fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Fetch the dashboard totals.
///
/// # Errors
///
/// Returns the pipeline's error when the call fails.
pub async fn summary(client: &ApiClient) -> ClientResult<Summary> {
    client.send(RequestDescriptor::get(SUMMARY_PATH)).await
}

/// List the most recent members.
///
/// # Errors
///
/// Returns the pipeline's error when the call fails.
pub async fn members(client: &ApiClient) -> ClientResult<Vec<Member>> {
    client.send(RequestDescriptor::get(MEMBERS_PATH)).await
}

/// List the most recent orders.
///
/// # Errors
///
/// Returns the pipeline's error when the call fails.
pub async fn orders(client: &ApiClient) -> ClientResult<Vec<Order>> {
    client.send(RequestDescriptor::get(ORDERS_PATH)).await
}

/// Register a member.
///
/// # Errors
///
/// Returns the server's validation error (for example a duplicate phone)
/// or the pipeline's error.
#[instrument(skip_all, fields(channel = %params.channel))]
pub async fn create_member(client: &ApiClient, params: &CreateMemberParams) -> ClientResult<Member> {
    let request = RequestDescriptor::post(MEMBERS_PATH).with_params(params)?;
    let member: Member = client.send(request).await?;
    info!(member_id = member.id, "member created");
    Ok(member)
}

/// Record an order.
///
/// # Errors
///
/// Returns the server's validation error (for example an unknown member)
/// or the pipeline's error.
#[instrument(skip_all, fields(member_id = params.member_id))]
pub async fn create_order(client: &ApiClient, params: &CreateOrderParams) -> ClientResult<Order> {
    let request = RequestDescriptor::post(ORDERS_PATH).with_params(params)?;
    let order: Order = client.send(request).await?;
    info!(order_id = order.id, "order created");
    Ok(order)
}
