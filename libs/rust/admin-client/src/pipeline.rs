//! Request pipeline.
//!
//! Stages run outermost first and each decides whether and how to call the
//! rest of the chain through [`Next`]. After the last stage the request is
//! issued on the transport and mapped to an envelope or error.

use crate::client::ClientContext;
use crate::envelope::ResponseEnvelope;
use crate::error::ClientResult;
use crate::request::RequestDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Outcome of one pass through the pipeline.
pub(crate) type StageResult = ClientResult<ResponseEnvelope<Value>>;

/// One step of request processing.
#[async_trait]
pub(crate) trait Stage: Send + Sync {
    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// Process `request`, usually by calling `next.run`.
    async fn handle(&self, request: RequestDescriptor, next: Next<'_>) -> StageResult;
}

/// The remainder of the pipeline after the current stage.
#[derive(Clone, Copy)]
pub(crate) struct Next<'a> {
    context: &'a ClientContext,
    stages: &'a [Box<dyn Stage>],
}

impl<'a> Next<'a> {
    pub(crate) const fn new(context: &'a ClientContext, stages: &'a [Box<dyn Stage>]) -> Self {
        Self { context, stages }
    }

    pub(crate) const fn context(&self) -> &'a ClientContext {
        self.context
    }

    /// Pass `request` to the next stage, or issue it after the last one.
    pub(crate) async fn run(self, request: RequestDescriptor) -> StageResult {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                debug!(stage = stage.name(), url = request.url(), "entering stage");
                stage.handle(request, Next::new(self.context, rest)).await
            }
            None => self.context.issue(request).await,
        }
    }
}

/// Standard stage order.
pub(crate) fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(RetryStage),
        Box::new(UnauthorizedStage),
        Box::new(CredentialStage),
    ]
}

/// Re-issues transient failures with a fixed delay.
pub(crate) struct RetryStage;

#[async_trait]
impl Stage for RetryStage {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn handle(&self, request: RequestDescriptor, next: Next<'_>) -> StageResult {
        let context = next.context();
        let mut attempt = 0_u32;
        context
            .retry_policy()
            .execute(|| {
                if attempt > 0 {
                    context.metrics().retries.inc();
                }
                attempt += 1;
                let request = request.clone();
                async move { next.run(request).await }
            })
            .await
    }
}

/// Refreshes the credential once when a call comes back unauthorized.
pub(crate) struct UnauthorizedStage;

#[async_trait]
impl Stage for UnauthorizedStage {
    fn name(&self) -> &'static str {
        "unauthorized"
    }

    async fn handle(&self, request: RequestDescriptor, next: Next<'_>) -> StageResult {
        match next.run(request.clone()).await {
            Err(error) if error.is_unauthorized() => {
                let context = next.context();
                let retry = context.gate().recover(request, error).await?;
                debug!(url = retry.url(), "re-issuing with refreshed credential");
                context.execute(retry).await
            }
            outcome => outcome,
        }
    }
}

/// Attaches the access token and shapes the body.
pub(crate) struct CredentialStage;

#[async_trait]
impl Stage for CredentialStage {
    fn name(&self) -> &'static str {
        "credential"
    }

    async fn handle(&self, mut request: RequestDescriptor, next: Next<'_>) -> StageResult {
        if !request.has_authorization() {
            let token = next.context().session().access_token().await;
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                request.set_authorization(&token)?;
            }
        }
        request.move_params_to_body();
        request.ensure_content_type()?;
        next.run(request).await
    }
}
