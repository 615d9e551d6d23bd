//! Test doubles for the client's collaborators.

use admin_client::{
    ClientError, CredentialPair, Notifier, PreparedRequest, SessionStore, Transport,
    TransportError, TransportResponse,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;

type Handler =
    dyn Fn(&PreparedRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport answering every request through a closure.
pub struct ScriptedTransport {
    handler: Arc<Handler>,
    latency: Duration,
    requests: RwLock<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    /// Create a transport that answers with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&PreparedRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Arc::new(handler),
            latency: Duration::ZERO,
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Delay every answer by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// All requests received so far.
    pub async fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests whose path equals `path`.
    pub async fn count_path(&self, path: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    /// Number of requests received so far.
    pub async fn count(&self) -> usize {
        self.requests.read().await.len()
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        self.requests.write().await.push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(&request)
    }
}

/// Notifier that records every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<(ClientError, bool)>>,
    successes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Create a new recording notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors reported so far with their visibility flag.
    pub fn errors(&self) -> Vec<(ClientError, bool)> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Success messages reported so far.
    pub fn successes(&self) -> Vec<String> {
        self.successes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of unauthorized errors reported.
    pub fn unauthorized_count(&self) -> usize {
        self.errors()
            .iter()
            .filter(|(err, _)| err.is_unauthorized())
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error(&self, error: &ClientError, visible: bool) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((error.clone(), visible));
    }

    fn show_success(&self, message: &str) {
        self.successes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Session store that counts mutations.
#[derive(Debug, Default)]
pub struct MockSessionStore {
    tokens: RwLock<Option<CredentialPair>>,
    set_tokens_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockSessionStore {
    /// Create an empty (signed out) store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `access_token` and `refresh_token`.
    #[must_use]
    pub fn signed_in(access_token: &str, refresh_token: &str) -> Self {
        Self {
            tokens: RwLock::new(Some(CredentialPair::new(access_token, refresh_token))),
            ..Self::default()
        }
    }

    /// Create a store holding only an access token.
    #[must_use]
    pub fn without_refresh_token(access_token: &str) -> Self {
        Self::signed_in(access_token, "")
    }

    /// Current pair, if any.
    pub async fn pair(&self) -> Option<CredentialPair> {
        self.tokens.read().await.clone()
    }

    /// Number of `set_tokens` calls.
    pub fn set_tokens_count(&self) -> usize {
        self.set_tokens_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_out` calls.
    pub fn sign_out_count(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|p| p.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|p| p.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    async fn set_tokens(&self, access_token: String, refresh_token: String) {
        self.set_tokens_calls.fetch_add(1, Ordering::SeqCst);
        *self.tokens.write().await = Some(CredentialPair::new(access_token, refresh_token));
    }

    async fn sign_out(&self) {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.write().await.take();
    }
}
