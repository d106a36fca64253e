//! Saved wardrobe items.

use serde::{Deserialize, Serialize};
use vesture_core::{ProductId, TryOnCategory, UserId, WardrobeItem, WardrobeItemId};

use super::WARDROBE_ITEMS;
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

/// Insert payload for a wardrobe item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWardrobeItem {
    pub user_id: UserId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub image_url: String,
    pub category: TryOnCategory,
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_for_user(
    client: &BackendClient,
    user_id: UserId,
    access_token: &str,
) -> Result<Vec<WardrobeItem>, BackendError> {
    let query = Query::new()
        .eq("user_id", user_id)
        .order("created_at", Direction::Desc);
    client
        .select(WARDROBE_ITEMS, &query, Auth::User(access_token))
        .await
}

/// # Errors
///
/// Returns an error if the request fails or is rejected.
pub async fn add(
    client: &BackendClient,
    item: &NewWardrobeItem,
    access_token: &str,
) -> Result<WardrobeItem, BackendError> {
    client
        .insert_one(WARDROBE_ITEMS, item, Auth::User(access_token))
        .await
}

/// Delete one of the user's items. Deleting a missing item is not an error.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn remove(
    client: &BackendClient,
    id: WardrobeItemId,
    user_id: UserId,
    access_token: &str,
) -> Result<(), BackendError> {
    let query = Query::new().eq("id", id).eq("user_id", user_id);
    client
        .delete(WARDROBE_ITEMS, &query, Auth::User(access_token))
        .await
}
