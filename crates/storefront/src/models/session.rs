//! Session-related types.
//!
//! Types stored in the session for authentication state and the cart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vesture_backend::AuthSession;
use vesture_core::UserId;

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECONDS: i64 = 30;

/// Assumed access token lifetime when the auth API does not report one.
const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3600;

const MAX_TOKEN_LIFETIME_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Session-stored identity of a signed-in shopper.
///
/// Carries the backend access token so requests can run under the
/// shopper's own credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentUser {
    /// Build from a fresh auth session.
    #[must_use]
    pub fn from_session(session: AuthSession, now: DateTime<Utc>) -> Self {
        let lifetime = session
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS)
            .min(MAX_TOKEN_LIFETIME_SECONDS);
        let lifetime = i64::try_from(lifetime).unwrap_or_default();

        Self {
            id: session.user.id,
            full_name: session.user.full_name().map(String::from),
            email: session.user.email,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: now + Duration::seconds(lifetime),
        }
    }

    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECONDS) >= self.expires_at
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing the cart.
    pub const CART: &str = "cart";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vesture_backend::AuthUser;

    use super::*;

    fn auth_session(expires_in: Option<u64>) -> AuthSession {
        AuthSession {
            access_token: "access-abc".to_string(),
            refresh_token: Some("refresh-xyz".to_string()),
            expires_in,
            user: AuthUser {
                id: UserId::generate(),
                email: Some("ada@example.com".to_string()),
                user_metadata: serde_json::json!({ "full_name": "Ada Lovelace" }),
            },
        }
    }

    #[test]
    fn test_from_session_computes_expiry() {
        let now = Utc::now();
        let user = CurrentUser::from_session(auth_session(Some(600)), now);
        assert_eq!(user.expires_at, now + Duration::seconds(600));
        assert_eq!(user.full_name.as_deref(), Some("Ada Lovelace"));
        assert!(!user.needs_refresh(now));
        assert!(user.needs_refresh(now + Duration::seconds(580)));
    }

    #[test]
    fn test_default_lifetime() {
        let now = Utc::now();
        let user = CurrentUser::from_session(auth_session(None), now);
        assert_eq!(user.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let user = CurrentUser::from_session(auth_session(None), Utc::now());
        let debug = format!("{user:?}");
        assert!(!debug.contains("access-abc"));
        assert!(!debug.contains("refresh-xyz"));
        assert!(debug.contains("ada@example.com"));
    }
}
