//! Authenticated HTTP client for the admin panel API.
//!
//! This crate provides:
//! - A request gateway that attaches credentials and shapes request bodies
//! - Transparent credential refresh shared by concurrent callers
//! - One refresh-and-retry per call, then a debounced sign-out notice
//! - Fixed-delay retry of transient failures
//! - Mapping of envelopes and transport failures to one error type
//! - Tracing setup and Prometheus counters

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mapper;
pub mod metrics;
pub mod notify;
mod pipeline;
pub mod refresh;
pub mod request;
pub mod retry;
pub mod session;
pub mod status;
pub mod tracing_config;
pub mod transport;
pub mod unauthorized;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use envelope::ResponseEnvelope;
pub use error::{ClientError, ClientResult, ConfigError};
pub use http::{HttpConfig, ReqwestTransport, build_http_client};
pub use metrics::ClientMetrics;
pub use notify::{Notifier, TracingNotifier};
pub use request::{Body, RequestDescriptor, RequestOptions};
pub use retry::{RetryConfig, RetryPolicy};
pub use session::{CredentialPair, InMemorySessionStore, SessionStore};
pub use status::ApiStatus;
pub use tracing_config::{TracingConfig, init_tracing};
pub use transport::{PreparedRequest, Transport, TransportError, TransportResponse};
