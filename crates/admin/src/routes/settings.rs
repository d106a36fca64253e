//! Store settings route handlers.
//!
//! Settings are free-form JSON values under short keys, e.g.
//! `announcement_bar`, `contact_email`.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::instrument;
use vesture_backend::repo;
use vesture_core::StoreSetting;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const MAX_KEY_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: JsonValue,
}

/// Keys are lowercase ASCII with `_`, `-` or `.` separators.
fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Setting keys are 1 to {MAX_KEY_LEN} characters of a-z, 0-9, '_', '-' or '.'"
        )))
    }
}

/// All settings, by key.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<StoreSetting>>> {
    let settings = repo::settings::list(state.backend()).await?;
    Ok(Json(settings))
}

/// One setting's value.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
) -> Result<Json<StoreSetting>> {
    let value = repo::settings::get(state.backend(), &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("setting {key}")))?;
    Ok(Json(StoreSetting { key, value }))
}

/// Insert or replace one setting.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(key): Path<String>,
    Json(request): Json<UpdateSettingRequest>,
) -> Result<Json<StoreSetting>> {
    check_key(&key)?;
    let setting = repo::settings::set(state.backend(), &key, request.value).await?;
    tracing::info!(key = %key, "Setting updated");
    Ok(Json(setting))
}
