//! Authentication extractors.
//!
//! The signed-in user lives in the session as a [`CurrentUser`]. Expired
//! access tokens are refreshed transparently; a failed refresh signs the
//! user out.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that optionally gets the signed-in user.
///
/// Unlike `RequireAuth`, this does not reject the request for guests.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Error returned when authentication is required but missing.
#[derive(Debug)]
pub enum AuthRejection {
    /// No user in the session.
    Unauthorized,
    /// The user's tokens could not be refreshed.
    SessionExpired,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Unauthorized => "Sign in required",
            Self::SessionExpired => "Session expired, please sign in again",
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;
        let user = load_current_user(session, state)
            .await?
            .ok_or(AuthRejection::Unauthorized)?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => load_current_user(session, state).await.ok().flatten(),
            None => None,
        };
        Ok(Self(user))
    }
}

/// Read the session user, refreshing the access token when it is about to
/// expire.
async fn load_current_user(
    session: &Session,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    if !user.needs_refresh(Utc::now()) {
        return Ok(Some(user));
    }

    let Some(refresh_token) = user.refresh_token.as_deref() else {
        let _ = clear_current_user(session).await;
        return Err(AuthRejection::SessionExpired);
    };

    match state.backend().refresh_session(refresh_token).await {
        Ok(auth_session) => {
            let refreshed = CurrentUser::from_session(auth_session, Utc::now());
            if let Err(e) = set_current_user(session, &refreshed).await {
                tracing::warn!(error = %e, "Failed to store refreshed session");
            }
            tracing::debug!(user_id = %refreshed.id, "Access token refreshed");
            Ok(Some(refreshed))
        }
        Err(e) => {
            tracing::info!(user_id = %user.id, error = %e, "Token refresh failed, signing out");
            let _ = clear_current_user(session).await;
            Err(AuthRejection::SessionExpired)
        }
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
