//! The public request gateway.
//!
//! [`ApiClient`] is a cheap handle over one shared client context, which owns
//! every piece of shared state: the single-flight refresh slot, the notice
//! window and the collaborators. Independent clients never share state.

use crate::config::ClientConfig;
use crate::envelope::ResponseEnvelope;
use crate::error::{ClientError, ClientResult, ConfigError};
use crate::http::ReqwestTransport;
use crate::mapper;
use crate::metrics::ClientMetrics;
use crate::notify::{Notifier, TracingNotifier};
use crate::pipeline::{self, Next, Stage, StageResult};
use crate::refresh::CredentialRefresher;
use crate::request::{RequestDescriptor, RequestOptions};
use crate::retry::RetryPolicy;
use crate::session::{CredentialPair, InMemorySessionStore, SessionStore};
use crate::transport::Transport;
use crate::unauthorized::UnauthorizedGate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Shared state behind an [`ApiClient`].
pub(crate) struct ClientContext {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    refresher: Arc<CredentialRefresher>,
    gate: UnauthorizedGate,
    retry: RetryPolicy,
    metrics: Arc<ClientMetrics>,
    stages: Vec<Box<dyn Stage>>,
}

impl ClientContext {
    /// Run `request` through the full pipeline.
    pub(crate) async fn execute(&self, request: RequestDescriptor) -> StageResult {
        Next::new(self, &self.stages).run(request).await
    }

    /// Send `request` on the transport and map the outcome.
    pub(crate) async fn issue(&self, request: RequestDescriptor) -> StageResult {
        let prepared = request
            .prepare(&self.config.base_url)
            .map_err(|e| e.with_request(request.method().as_str(), request.url()))?;
        let method = prepared.method.to_string();
        let url = prepared.url.to_string();

        self.metrics.requests_issued.inc();
        debug!(%method, %url, retried = request.is_retried(), "issuing request");

        let outcome = match self.transport.execute(prepared).await {
            Ok(response) => mapper::map_response(&response),
            Err(e) => {
                debug!(error = %e, "transport failure");
                Err(mapper::map_transport_error(&e))
            }
        };
        outcome.map_err(|e| e.with_request(method, url))
    }

    pub(crate) const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub(crate) const fn gate(&self) -> &UnauthorizedGate {
        &self.gate
    }

    pub(crate) fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }
}

/// Authenticated client for the admin API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientContext>,
}

impl ApiClient {
    /// Create a client with default collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Start building a client with custom collaborators.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Send a request and decode the envelope's `data` into `T`.
    ///
    /// Failures other than unauthorized are forwarded to the notifier, hidden
    /// if the request suppressed them. Terminal unauthorized failures are
    /// notified by the gate at most once per debounce window.
    ///
    /// # Errors
    ///
    /// Returns the [`ClientError`] the pipeline ended with, or a malformed
    /// response error if `data` does not decode into `T`.
    #[instrument(skip(self, request), fields(method = %request.method(), url = request.url()))]
    pub async fn send<T: DeserializeOwned>(&self, request: RequestDescriptor) -> ClientResult<T> {
        let options = request.options();
        let result = self.inner.execute(request).await.and_then(|envelope| {
            let data = decode::<T>(envelope.data)?;
            Ok((data, envelope.msg))
        });
        self.notify(options, result.as_ref().map(|(_, message)| message.as_str()));
        result.map(|(data, _)| data)
    }

    /// Send a request and return the raw success envelope.
    ///
    /// Notifications follow the same rules as [`ApiClient::send`].
    ///
    /// # Errors
    ///
    /// Returns the [`ClientError`] the pipeline ended with.
    pub async fn send_envelope(
        &self,
        request: RequestDescriptor,
    ) -> ClientResult<ResponseEnvelope<Value>> {
        let options = request.options();
        let result = self.inner.execute(request).await;
        self.notify(options, result.as_ref().map(|envelope| envelope.msg.as_str()));
        result
    }

    /// Report the final outcome of a call to the notifier.
    fn notify(&self, options: RequestOptions, outcome: Result<&str, &ClientError>) {
        match outcome {
            Ok(message) if options.show_success_notification && !message.is_empty() => {
                self.inner.notifier.show_success(message);
            }
            Err(err) if !err.is_unauthorized() => {
                self.inner
                    .notifier
                    .show_error(err, !options.suppress_error_notification);
            }
            _ => {}
        }
    }

    /// Store a freshly issued credential pair.
    pub async fn sign_in(&self, pair: CredentialPair) {
        self.inner.gate.reset().await;
        self.inner
            .session
            .set_tokens(pair.access_token, pair.refresh_token)
            .await;
        info!("session started");
    }

    /// Clear the session and tear down pending refresh and notice state.
    pub async fn sign_out(&self) {
        self.inner.gate.reset().await;
        self.inner.refresher.reset().await;
        self.inner.session.sign_out().await;
        info!("session ended");
    }

    /// Client counters.
    #[must_use]
    pub fn metrics(&self) -> &ClientMetrics {
        &self.inner.metrics
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session store in use.
    #[must_use]
    pub fn session(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.inner.session)
    }

    /// Whether a refresh exchange is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.refresher.is_refreshing().await
    }

    /// Whether a session-termination notice is active.
    pub async fn unauthorized_notice_active(&self) -> bool {
        self.inner.gate.notice_active().await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(data: Option<Value>) -> ClientResult<T> {
    serde_json::from_value(data.unwrap_or(Value::Null)).map_err(ClientError::malformed_response)
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    session: Option<Arc<dyn SessionStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    transport: Option<Arc<dyn Transport>>,
    refresh_transport: Option<Arc<dyn Transport>>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ApiClientBuilder {
    /// Create a builder for `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
            notifier: None,
            transport: None,
            refresh_transport: None,
            metrics: None,
        }
    }

    /// Use a custom session store. Defaults to [`InMemorySessionStore`].
    #[must_use]
    pub fn session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Use a custom notifier. Defaults to [`TracingNotifier`].
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use a custom transport for ordinary calls.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom transport for refresh exchanges.
    ///
    /// Defaults to the custom call transport if one was given, otherwise to
    /// a separate HTTP client.
    #[must_use]
    pub fn refresh_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.refresh_transport = Some(transport);
        self
    }

    /// Record counters into `metrics`.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh URL is invalid or an HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        let config = self.config;
        let refresh_url = config.refresh_url()?;

        let transport: Arc<dyn Transport> = match self.transport.clone() {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&config.http)?),
        };
        let refresh_transport: Arc<dyn Transport> = match self.refresh_transport.or(self.transport)
        {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&config.http)?),
        };
        let session: Arc<dyn SessionStore> = match self.session {
            Some(session) => session,
            None => Arc::new(InMemorySessionStore::new()),
        };
        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };
        let metrics = self.metrics.unwrap_or_default();

        let refresher = Arc::new(CredentialRefresher::new(
            refresh_transport,
            Arc::clone(&session),
            refresh_url,
            Arc::clone(&metrics),
        ));
        let gate = UnauthorizedGate::new(
            &config,
            Arc::clone(&session),
            Arc::clone(&refresher),
            Arc::clone(&notifier),
            Arc::clone(&metrics),
        );

        debug!(base_url = %config.base_url, "api client built");

        Ok(ApiClient {
            inner: Arc::new(ClientContext {
                retry: RetryPolicy::new(config.retry),
                config,
                transport,
                session,
                notifier,
                refresher,
                gate,
                metrics,
                stages: pipeline::default_stages(),
            }),
        })
    }
}

impl std::fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
