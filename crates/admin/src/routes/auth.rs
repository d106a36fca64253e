//! Authentication route handlers.
//!
//! Admins sign in with the same email/password accounts as shoppers. The
//! password is checked by the hosted auth API; the profile role decides
//! whether the session is granted.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vesture_backend::{Auth, repo};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sign in. Only profiles with the admin role get a session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<CurrentAdmin>> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let auth_session = state
        .backend()
        .sign_in_with_password(email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Admin login failed"))?;

    let profile = repo::profiles::get(state.backend(), auth_session.user.id, Auth::Service).await?;

    // The user token is not needed past this point
    if let Err(e) = state.backend().sign_out(&auth_session.access_token).await {
        tracing::warn!(error = %e, "Failed to revoke sign-in token");
    }

    let Some(profile) = profile.filter(vesture_core::Profile::is_admin) else {
        tracing::warn!(user_id = %auth_session.user.id, "Non-admin tried to sign in");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    };

    let admin = CurrentAdmin::from(&profile);
    // New session id on privilege change
    session.cycle_id().await?;
    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, &admin.email);
    tracing::info!(admin_id = %admin.id, "Admin signed in");

    Ok(Json(admin))
}

/// Sign out and destroy the session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> StatusCode {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!(error = %e, "Failed to clear session admin");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    StatusCode::NO_CONTENT
}
