//! Password authentication against the hosted auth API (`/auth/v1`).

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use vesture_core::UserId;

use crate::client::{Auth, BackendClient};
use crate::error::BackendError;

/// The authenticated user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata supplied at sign-up (`full_name`, ...).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// `full_name` from sign-up metadata, if present.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(|v| v.as_str())
    }
}

/// Tokens issued on sign-in.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up.
///
/// Projects with email confirmation enabled return only the user; others
/// sign the user in straight away.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(AuthUser),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl BackendClient {
    /// Exchange an email/password pair for a session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidCredentials` when the pair is rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self
            .request(Method::POST, url, Auth::Anon)?
            .json(&PasswordCredentials { email, password });

        // The token endpoint answers 400 for a wrong password
        self.send_json(request)
            .await
            .map_err(|e| match e {
                BackendError::Api { status: 400, .. } | BackendError::Unauthorized(_) => {
                    BackendError::InvalidCredentials
                }
                other => other,
            })
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is taken or the password is rejected.
    #[instrument(skip(self, password, full_name))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let request = self.request(Method::POST, url, Auth::Anon)?.json(&SignUpRequest {
            email,
            password,
            data: SignUpMetadata { full_name },
        });
        self.send_json(request).await
    }

    /// Resolve an access token to its user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let request = self.request(Method::GET, url, Auth::User(access_token))?;
        self.send_json(request).await
    }

    /// Trade a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is invalid or already used.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");
        let request = self
            .request(Method::POST, url, Auth::Anon)?
            .json(&RefreshRequest { refresh_token });
        self.send_json(request).await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let request = self.request(Method::POST, url, Auth::User(access_token))?;
        self.send(request).await.map(|_| ())
    }
}
