//! Credential refresh with single-flight deduplication.
//!
//! Concurrent callers that need a new access token share one exchange. The
//! exchange goes straight to its own transport so an unauthorized reply can
//! never trigger another refresh.

use crate::api::auth::{RefreshRequest, TokenPayload};
use crate::error::{ClientError, ClientResult};
use crate::mapper;
use crate::metrics::ClientMetrics;
use crate::request::JSON_CONTENT_TYPE;
use crate::session::SessionStore;
use crate::transport::{PreparedRequest, Transport};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Type alias for the shared refresh future.
type InflightFuture = Shared<BoxFuture<'static, ClientResult<String>>>;

struct Inflight {
    id: u64,
    future: InflightFuture,
}

/// Renews the access token using the stored refresh token.
pub struct CredentialRefresher {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    refresh_url: Url,
    inflight: Arc<Mutex<Option<Inflight>>>,
    next_id: AtomicU64,
    metrics: Arc<ClientMetrics>,
}

impl CredentialRefresher {
    /// Create a refresher sending exchanges to `refresh_url` over `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        refresh_url: Url,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            transport,
            session,
            refresh_url,
            inflight: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
            metrics,
        }
    }

    /// Obtain a new access token.
    ///
    /// Joins the exchange already in flight if there is one. The in-flight
    /// slot is cleared before any caller observes the result.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error if no refresh token is stored or the
    /// exchange fails for any reason.
    pub async fn refresh(&self) -> ClientResult<String> {
        let mut inflight_guard = self.inflight.lock().await;

        if let Some(ref inflight) = *inflight_guard {
            let fut = inflight.future.clone();
            drop(inflight_guard);
            debug!("joining in-flight refresh");
            return fut.await;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let exchange = exchange(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            self.refresh_url.clone(),
            Arc::clone(&self.metrics),
        );
        let slot = Arc::clone(&self.inflight);

        let fut: BoxFuture<'static, ClientResult<String>> = Box::pin(async move {
            let result = exchange.await;
            let mut guard = slot.lock().await;
            if guard.as_ref().is_some_and(|current| current.id == id) {
                guard.take();
            }
            result
        });

        let shared_fut = fut.shared();
        *inflight_guard = Some(Inflight {
            id,
            future: shared_fut.clone(),
        });
        drop(inflight_guard);

        shared_fut.await
    }

    /// Whether an exchange is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inflight.lock().await.is_some()
    }

    /// Forget the in-flight exchange, if any.
    ///
    /// Callers already waiting on it still receive its result.
    pub async fn reset(&self) {
        if self.inflight.lock().await.take().is_some() {
            debug!("in-flight refresh detached");
        }
    }
}

impl std::fmt::Debug for CredentialRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRefresher")
            .field("refresh_url", &self.refresh_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Perform one refresh exchange and persist the renewed pair.
#[instrument(skip(transport, session, metrics), fields(url = %refresh_url))]
async fn exchange(
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    refresh_url: Url,
    metrics: Arc<ClientMetrics>,
) -> ClientResult<String> {
    let Some(refresh_token) = session.refresh_token().await.filter(|t| !t.is_empty()) else {
        warn!("no refresh token stored");
        return Err(ClientError::unauthorized(""));
    };

    let body = serde_json::to_vec(&RefreshRequest {
        refresh_token: &refresh_token,
    })
    .map_err(ClientError::request_config)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    metrics.refresh_exchanges.inc();
    info!("refreshing access token");

    let response = transport
        .execute(PreparedRequest {
            method: Method::POST,
            url: refresh_url,
            headers,
            body: Some(body),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "refresh exchange failed");
            ClientError::unauthorized("")
        })?;

    let envelope = mapper::map_response(&response).map_err(|e| {
        warn!(code = e.code, "refresh rejected");
        ClientError::unauthorized(e.message)
    })?;

    let payload: TokenPayload = match envelope.data {
        Some(data) => serde_json::from_value(data).map_err(|e| {
            warn!(error = %e, "refresh payload malformed");
            ClientError::unauthorized("")
        })?,
        None => TokenPayload::default(),
    };

    let Some(pair) = payload.into_pair() else {
        warn!("refresh response missing a token");
        return Err(ClientError::unauthorized(""));
    };

    session
        .set_tokens(pair.access_token.clone(), pair.refresh_token)
        .await;
    info!("access token refreshed");
    Ok(pair.access_token)
}
