//! Credential storage collaborator.
//!
//! The client reads and renews credentials through [`SessionStore`]; it does
//! not decide how they are persisted. [`InMemorySessionStore`] is the default
//! process-local implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

/// Access and refresh token issued together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    /// Short-lived token attached to each call
    pub access_token: String,
    /// Longer-lived token used only to renew the access token
    pub refresh_token: String,
}

impl CredentialPair {
    /// Create a new pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Process-wide owner of the credential pair.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current access token, if signed in.
    async fn access_token(&self) -> Option<String>;

    /// Current refresh token, if signed in.
    async fn refresh_token(&self) -> Option<String>;

    /// Replace both tokens.
    async fn set_tokens(&self, access_token: String, refresh_token: String);

    /// Clear the session.
    async fn sign_out(&self);
}

/// Session store keeping the pair in memory.
#[derive(Default)]
pub struct InMemorySessionStore {
    tokens: RwLock<Option<(SecretString, SecretString)>>,
}

impl InMemorySessionStore {
    /// Create an empty (signed out) store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `pair`.
    #[must_use]
    pub fn with_credentials(pair: CredentialPair) -> Self {
        Self {
            tokens: RwLock::new(Some((
                SecretString::from(pair.access_token),
                SecretString::from(pair.refresh_token),
            ))),
        }
    }

    /// Whether a credential pair is held.
    pub async fn is_signed_in(&self) -> bool {
        self.tokens.read().await.is_some()
    }
}

impl fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySessionStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|(access, _)| access.expose_secret().to_owned())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|(_, refresh)| refresh.expose_secret().to_owned())
    }

    async fn set_tokens(&self, access_token: String, refresh_token: String) {
        *self.tokens.write().await = Some((
            SecretString::from(access_token),
            SecretString::from(refresh_token),
        ));
        debug!("session tokens replaced");
    }

    async fn sign_out(&self) {
        self.tokens.write().await.take();
        debug!("session cleared");
    }
}
