//! Profile rows. One per auth user, created by a backend trigger on sign-up.

use serde::Serialize;
use vesture_core::{Profile, UserId, UserRole};

use super::PROFILES;
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

#[derive(Serialize)]
struct RolePatch {
    role: UserRole,
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn get(
    client: &BackendClient,
    id: UserId,
    auth: Auth<'_>,
) -> Result<Option<Profile>, BackendError> {
    client
        .select_one(PROFILES, &Query::new().eq("id", id), auth)
        .await
}

/// All profiles, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list(client: &BackendClient) -> Result<Vec<Profile>, BackendError> {
    let query = Query::new().order("created_at", Direction::Desc);
    client.select(PROFILES, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn set_role(
    client: &BackendClient,
    id: UserId,
    role: UserRole,
) -> Result<Option<Profile>, BackendError> {
    let rows: Vec<Profile> = client
        .update(
            PROFILES,
            &Query::new().eq("id", id),
            &RolePatch { role },
            Auth::Service,
        )
        .await?;
    Ok(rows.into_iter().next())
}

/// Number of profiles with `role`.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn count_by_role(client: &BackendClient, role: UserRole) -> Result<usize, BackendError> {
    let query = Query::new().select("id").eq("role", role);
    let rows: Vec<serde_json::Value> = client.select(PROFILES, &query, Auth::Service).await?;
    Ok(rows.len())
}
