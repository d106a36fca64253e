//! Authentication route handlers.
//!
//! Email/password accounts are managed by the hosted auth API; the session
//! only keeps the issued tokens.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;
use vesture_backend::{SignUpOutcome, repo};
use vesture_core::{Email, Profile, UserId};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Shortest accepted password.
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// The signed-in user as returned to the client.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    /// Present when the profile row could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl UserView {
    fn from_user(user: &CurrentUser, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            profile,
        }
    }
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw.trim()).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Start a session for freshly issued tokens.
async fn sign_in_session(session: &Session, user: &CurrentUser) -> Result<()> {
    // New session id on privilege change
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    Ok(())
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserView>> {
    let email = parse_email(&request.email)?;
    if request.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    let auth_session = state
        .backend()
        .sign_in_with_password(email.as_str(), &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    let user = CurrentUser::from_session(auth_session, Utc::now());
    sign_in_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(UserView::from_user(&user, None)))
}

/// Create an account.
///
/// Returns 201 with the user when the account is usable immediately, or 202
/// when the auth API first requires email confirmation.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SignUpRequest>,
) -> Result<Response> {
    let email = parse_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let outcome = state
        .backend()
        .sign_up(email.as_str(), &request.password, full_name)
        .await?;

    match outcome {
        SignUpOutcome::SignedIn(auth_session) => {
            let user = CurrentUser::from_session(auth_session, Utc::now());
            sign_in_session(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User signed up");
            Ok((StatusCode::CREATED, Json(UserView::from_user(&user, None))).into_response())
        }
        SignUpOutcome::ConfirmationRequired(auth_user) => {
            tracing::info!(user_id = %auth_user.id, "User signed up, confirmation pending");
            let body = json!({
                "confirmation_required": true,
                "message": "Check your email to confirm your account",
            });
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

/// Sign out and destroy the session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> StatusCode {
    // Revoke the token upstream (best effort)
    if let Some(user) = user
        && let Err(e) = state.backend().sign_out(&user.access_token).await
    {
        tracing::warn!(error = %e, "Failed to revoke access token");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session user");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    StatusCode::NO_CONTENT
}

/// The signed-in user with their profile.
#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Json<UserView> {
    let profile = repo::profiles::get(
        state.backend(),
        user.id,
        vesture_backend::Auth::User(&user.access_token),
    )
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load profile");
        None
    });

    Json(UserView::from_user(&user, profile))
}
