//! Authentication extractor for admin.
//!
//! Every `/api` handler takes [`RequireAdmin`]; only sign-in writes a
//! [`CurrentAdmin`] into the session, and only for admin profiles.
//!
//! Reads trust the session. Writes re-read the profile so a demoted admin
//! loses write access immediately.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;
use vesture_backend::{Auth, repo};

use crate::error::AppError;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires an admin session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Why an admin request was refused.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// No admin is signed in.
    SignInRequired,
    /// The signed-in user is no longer an admin.
    Revoked,
    /// The role could not be checked.
    Backend(AppError),
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::SignInRequired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Admin sign-in required" })),
            )
                .into_response(),
            Self::Revoked => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin access has been revoked" })),
            )
                .into_response(),
            Self::Backend(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::SignInRequired)?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::SignInRequired)?;

        if !parts.method.is_safe() {
            let profile = repo::profiles::get(state.backend(), admin.id, Auth::Service)
                .await
                .map_err(|e| AdminAuthRejection::Backend(e.into()))?;
            if !profile.is_some_and(|p| p.is_admin()) {
                tracing::warn!(admin_id = %admin.id, "Admin role revoked, ending session");
                let _ = session.flush().await;
                return Err(AdminAuthRejection::Revoked);
            }
        }

        Ok(Self(admin))
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}
