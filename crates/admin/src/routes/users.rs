//! User management route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;
use vesture_backend::repo;
use vesture_core::{Profile, UserId, UserRole};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// All user profiles, newest first.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Profile>>> {
    let profiles = repo::profiles::list(state.backend()).await?;
    Ok(Json(profiles))
}

/// Grant or revoke admin access.
///
/// An admin cannot change their own role.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<Profile>> {
    let role: UserRole = request.role.trim().parse().map_err(AppError::BadRequest)?;
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    let profile = repo::profiles::set_role(state.backend(), id, role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    tracing::info!(user_id = %id, %role, "User role changed");
    Ok(Json(profile))
}
