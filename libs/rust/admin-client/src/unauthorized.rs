//! Unauthorized handling: one refresh-and-retry per call, then a debounced
//! session-termination notice.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::metrics::ClientMetrics;
use crate::notify::Notifier;
use crate::refresh::CredentialRefresher;
use crate::request::RequestDescriptor;
use crate::session::SessionStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// An active notice and the timer that will close it.
struct NoticeWindow {
    id: u64,
    timer: JoinHandle<()>,
}

/// Decides whether an unauthorized call can be recovered.
pub struct UnauthorizedGate {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    refresher: Arc<CredentialRefresher>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<ClientMetrics>,
    notice: Arc<Mutex<Option<NoticeWindow>>>,
    pending_sign_out: Mutex<Option<JoinHandle<()>>>,
    next_window: AtomicU64,
}

impl UnauthorizedGate {
    /// Create a gate using the timing settings of `config`.
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionStore>,
        refresher: Arc<CredentialRefresher>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            config: config.clone(),
            session,
            refresher,
            notifier,
            metrics,
            notice: Arc::new(Mutex::new(None)),
            pending_sign_out: Mutex::new(None),
            next_window: AtomicU64::new(0),
        }
    }

    /// Try to make `request` succeed after it failed with `error`.
    ///
    /// On success the returned descriptor carries the new access token and
    /// the retried marker; the caller re-issues it.
    ///
    /// # Errors
    ///
    /// Returns the terminal unauthorized error when the call was already
    /// retried, targeted the refresh endpoint, or no refresh was possible.
    pub async fn recover(
        &self,
        mut request: RequestDescriptor,
        error: ClientError,
    ) -> ClientResult<RequestDescriptor> {
        if request.is_retried() || self.config.is_refresh_url(request.url()) {
            debug!(url = request.url(), "unauthorized after refresh, giving up");
            return Err(self.terminate(&error).await);
        }

        let has_refresh_token = self
            .session
            .refresh_token()
            .await
            .is_some_and(|t| !t.is_empty());
        if !has_refresh_token {
            debug!("no refresh token, giving up");
            return Err(self.terminate(&error).await);
        }

        match self.refresher.refresh().await {
            Ok(token) => {
                request.mark_retried();
                request.set_authorization(&token)?;
                Ok(request)
            }
            Err(refresh_error) => {
                debug!(code = refresh_error.code, "refresh failed");
                Err(self.terminate(&error).await)
            }
        }
    }

    /// Terminal unauthorized handling.
    ///
    /// The first call in a debounce window schedules sign-out and shows the
    /// notice; later calls in the same window only build the error.
    pub async fn handle_unauthorized(&self, message: &str) -> ClientError {
        self.notify_once(ClientError::unauthorized(message)).await
    }

    /// Whether a session-termination notice is active.
    pub async fn notice_active(&self) -> bool {
        self.notice.lock().await.is_some()
    }

    /// Close the current notice window and cancel a sign-out that has not
    /// run yet.
    pub async fn reset(&self) {
        if let Some(window) = self.notice.lock().await.take() {
            window.timer.abort();
            debug!("unauthorized notice window closed");
        }
        if let Some(sign_out) = self.pending_sign_out.lock().await.take() {
            sign_out.abort();
            debug!("pending sign-out cancelled");
        }
    }

    async fn terminate(&self, cause: &ClientError) -> ClientError {
        let mut error = ClientError::unauthorized(cause.message.clone());
        error.method.clone_from(&cause.method);
        error.url.clone_from(&cause.url);
        self.notify_once(error).await
    }

    async fn notify_once(&self, error: ClientError) -> ClientError {
        let mut notice = self.notice.lock().await;
        if notice.is_some() {
            debug!("unauthorized notice already shown");
            return error;
        }

        let id = self.next_window.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.notice);
        let debounce = self.config.unauthorized_debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let mut notice = slot.lock().await;
            if notice.as_ref().is_some_and(|current| current.id == id) {
                notice.take();
            }
        });
        *notice = Some(NoticeWindow { id, timer });
        drop(notice);

        self.schedule_sign_out().await;
        self.metrics.unauthorized_notices.inc();
        warn!(url = error.url.as_deref().unwrap_or("-"), "session terminated");
        self.notifier.show_error(&error, true);
        error
    }

    async fn schedule_sign_out(&self) {
        let session = Arc::clone(&self.session);
        let delay = self.config.logout_delay;
        self.metrics.sign_outs.inc();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.sign_out().await;
            info!("signed out after unauthorized response");
        });
        // A sign-out from an earlier window is superseded by this one.
        if let Some(previous) = self.pending_sign_out.lock().await.replace(task) {
            previous.abort();
        }
    }
}

impl std::fmt::Debug for UnauthorizedGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedGate")
            .field("refresh_path", &self.config.refresh_path)
            .field("debounce", &self.config.unauthorized_debounce)
            .field("logout_delay", &self.config.logout_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CredentialPair, InMemorySessionStore};
    use crate::transport::{PreparedRequest, Transport, TransportError, TransportResponse};
    use async_trait::async_trait;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingNotifier {
        errors: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn show_error(&self, _error: &ClientError, visible: bool) {
            assert!(visible);
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn show_success(&self, _message: &str) {}
    }

    struct TokenServer;

    #[async_trait]
    impl Transport for TokenServer {
        async fn execute(
            &self,
            _request: PreparedRequest,
        ) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse::json(
                200,
                &json!({ "code": 200, "data": { "token": "T2", "refreshToken": "R2" } }),
            ))
        }
    }

    struct Fixture {
        gate: UnauthorizedGate,
        session: Arc<InMemorySessionStore>,
        notifier: Arc<CountingNotifier>,
        metrics: Arc<ClientMetrics>,
    }

    fn fixture(session: InMemorySessionStore) -> Fixture {
        fixture_with(&ClientConfig::default(), session)
    }

    fn fixture_with(config: &ClientConfig, session: InMemorySessionStore) -> Fixture {
        let session = Arc::new(session);
        let notifier = Arc::new(CountingNotifier::default());
        let metrics = Arc::new(ClientMetrics::default());
        let refresher = Arc::new(CredentialRefresher::new(
            Arc::new(TokenServer),
            Arc::clone(&session) as Arc<dyn SessionStore>,
            config.refresh_url().unwrap(),
            Arc::clone(&metrics),
        ));
        let gate = UnauthorizedGate::new(
            config,
            Arc::clone(&session) as Arc<dyn SessionStore>,
            refresher,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&metrics),
        );
        Fixture {
            gate,
            session,
            notifier,
            metrics,
        }
    }

    fn signed_in() -> InMemorySessionStore {
        InMemorySessionStore::with_credentials(CredentialPair::new("T1", "R1"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_attaches_new_token() {
        let f = fixture(signed_in());

        let request = f
            .gate
            .recover(
                RequestDescriptor::get("/api/user/info"),
                ClientError::unauthorized(""),
            )
            .await
            .unwrap();

        assert!(request.is_retried());
        assert_eq!(request.headers()[AUTHORIZATION], "T2");
        assert_eq!(f.metrics.refresh_exchanges.get(), 1);
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retried_request_never_refreshes_again() {
        let f = fixture(signed_in());
        let mut request = RequestDescriptor::get("/api/user/info");
        request.mark_retried();

        let err = f
            .gate
            .recover(request, ClientError::unauthorized("token expired"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.message, "token expired");
        assert_eq!(f.metrics.refresh_exchanges.get(), 0);
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_endpoint_is_terminal() {
        let f = fixture(signed_in());

        let err = f
            .gate
            .recover(
                RequestDescriptor::post("/api/auth/refresh"),
                ClientError::unauthorized(""),
            )
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(f.metrics.refresh_exchanges.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_refresh_path_is_terminal() {
        let config = ClientConfig::default().with_refresh_path("/api/session/renew");
        let f = fixture_with(&config, signed_in());

        let err = f
            .gate
            .recover(
                RequestDescriptor::post("/api/session/renew"),
                ClientError::unauthorized(""),
            )
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(f.metrics.refresh_exchanges.get(), 0);

        let request = f
            .gate
            .recover(
                RequestDescriptor::post("/api/auth/refresh"),
                ClientError::unauthorized(""),
            )
            .await
            .unwrap();
        assert!(request.is_retried());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_refresh_token_is_terminal() {
        let f = fixture(InMemorySessionStore::new());

        let err = f
            .gate
            .recover(
                RequestDescriptor::get("/api/user/info"),
                ClientError::unauthorized(""),
            )
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(f.metrics.refresh_exchanges.get(), 0);
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_debounced_within_window() {
        let f = fixture(signed_in());

        for _ in 0..5 {
            let err = f.gate.handle_unauthorized("").await;
            assert!(err.is_unauthorized());
        }
        assert!(f.gate.notice_active().await);
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 1);
        assert_eq!(f.metrics.sign_outs.get(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!f.session.is_signed_in().await);

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert!(!f.gate.notice_active().await);

        f.gate.handle_unauthorized("").await;
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 2);
        assert_eq!(f.metrics.unauthorized_notices.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_closes_window() {
        let f = fixture(signed_in());

        f.gate.handle_unauthorized("").await;
        assert!(f.gate.notice_active().await);

        f.gate.reset().await;
        assert!(!f.gate.notice_active().await);

        f.gate.handle_unauthorized("").await;
        assert_eq!(f.notifier.errors.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_sign_out() {
        let f = fixture(signed_in());

        f.gate.handle_unauthorized("").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        f.gate.reset().await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(f.session.is_signed_in().await);
        assert_eq!(f.metrics.sign_outs.get(), 1);
    }
}
