//! Try-on history.

use serde::Serialize;
use vesture_core::{ProductId, TryOnCategory, TryOnProvider, TryOnResult, UserId};

use super::TRYON_RESULTS;
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

/// Most recent try-ons returned by [`list_for_user`].
pub const HISTORY_LIMIT: usize = 50;

/// Insert payload for a finished try-on.
#[derive(Debug, Clone, Serialize)]
pub struct NewTryOnResult<'a> {
    pub user_id: UserId,
    pub product_id: Option<ProductId>,
    pub category: TryOnCategory,
    pub provider: TryOnProvider,
    pub result_image: &'a str,
}

/// # Errors
///
/// Returns an error if the request fails or is rejected.
pub async fn record(
    client: &BackendClient,
    result: &NewTryOnResult<'_>,
    access_token: &str,
) -> Result<TryOnResult, BackendError> {
    client
        .insert_one(TRYON_RESULTS, result, Auth::User(access_token))
        .await
}

/// The user's latest try-ons, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_for_user(
    client: &BackendClient,
    user_id: UserId,
    access_token: &str,
) -> Result<Vec<TryOnResult>, BackendError> {
    let query = Query::new()
        .eq("user_id", user_id)
        .order("created_at", Direction::Desc)
        .limit(HISTORY_LIMIT);
    client
        .select(TRYON_RESULTS, &query, Auth::User(access_token))
        .await
}
