//! Store settings (key/value JSON).

use serde_json::Value as JsonValue;
use vesture_core::StoreSetting;

use super::STORE_SETTINGS;
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

/// # Errors
///
/// Returns an error if the request fails.
pub async fn list(client: &BackendClient) -> Result<Vec<StoreSetting>, BackendError> {
    let query = Query::new().order("key", Direction::Asc);
    client.select(STORE_SETTINGS, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn get(client: &BackendClient, key: &str) -> Result<Option<JsonValue>, BackendError> {
    let setting: Option<StoreSetting> = client
        .select_one(STORE_SETTINGS, &Query::new().eq("key", key), Auth::Service)
        .await?;
    Ok(setting.map(|s| s.value))
}

/// Insert or replace a setting.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn set(
    client: &BackendClient,
    key: &str,
    value: JsonValue,
) -> Result<StoreSetting, BackendError> {
    let row = StoreSetting {
        key: key.to_string(),
        value,
    };
    let rows: Vec<StoreSetting> = client
        .upsert(STORE_SETTINGS, &row, "key", Auth::Service)
        .await?;
    rows.into_iter().next().ok_or_else(|| BackendError::Api {
        status: 500,
        message: format!("upsert of setting {key} returned no rows"),
    })
}
