//! Authentication endpoints and their wire types.

use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::RequestDescriptor;
use crate::session::CredentialPair;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Path of the sign-in endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Path of the current user endpoint.
pub const USER_INFO_PATH: &str = "/api/user/info";

/// Sign-in request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    /// Account name
    pub user_name: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Token pair returned by sign-in and refresh.
///
/// Both fields are optional on the wire; callers decide whether a partial
/// payload is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    /// New access token
    #[serde(default)]
    pub token: Option<String>,
    /// New refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenPayload {
    /// Convert into a credential pair if both tokens are present and non-empty.
    #[must_use]
    pub fn into_pair(self) -> Option<CredentialPair> {
        let token = self.token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        Some(CredentialPair::new(token, refresh_token))
    }
}

/// Refresh exchange request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    /// Refresh token being exchanged
    pub refresh_token: &'a str,
}

/// Profile of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    /// User identifier
    pub user_id: i64,
    /// Account name
    pub user_name: String,
    /// Email address
    pub email: String,
    /// Avatar URL
    pub avatar: String,
    /// Role codes
    pub roles: Vec<String>,
    /// Button permission marks
    pub buttons: Vec<String>,
}

/// Sign in and store the returned credential pair.
///
/// # Errors
///
/// Returns the server's error, or a malformed response error if the payload
/// lacks either token.
#[instrument(skip(client, password))]
pub async fn login(client: &ApiClient, user_name: &str, password: &str) -> ClientResult<CredentialPair> {
    let request = RequestDescriptor::post(LOGIN_PATH).with_json(&LoginRequest {
        user_name,
        password,
    })?;

    let payload: TokenPayload = client.send(request).await?;
    let pair = payload.into_pair().ok_or_else(|| {
        ClientError::malformed_response("sign-in response is missing a token")
    })?;

    client.sign_in(pair.clone()).await;
    info!("signed in");
    Ok(pair)
}

/// Fetch the signed-in user's profile.
///
/// # Errors
///
/// Returns the pipeline's error when the call fails.
pub async fn user_info(client: &ApiClient) -> ClientResult<UserInfo> {
    client.send(RequestDescriptor::get(USER_INFO_PATH)).await
}
