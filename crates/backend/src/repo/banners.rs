//! Home page banners.

use serde::{Deserialize, Serialize};
use vesture_core::{Banner, BannerId};

use super::{BANNERS, explicit_null};
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

/// Insert payload for a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBanner {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_active: bool,
}

/// Partial update for a banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtitle: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub link_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Active banners in display order. Public read.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_active(client: &BackendClient) -> Result<Vec<Banner>, BackendError> {
    let query = Query::new()
        .eq("is_active", true)
        .order("position", Direction::Asc);
    client.select(BANNERS, &query, Auth::Anon).await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_all(client: &BackendClient) -> Result<Vec<Banner>, BackendError> {
    let query = Query::new().order("position", Direction::Asc);
    client.select(BANNERS, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails or is rejected.
pub async fn create(client: &BackendClient, banner: &NewBanner) -> Result<Banner, BackendError> {
    client.insert_one(BANNERS, banner, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails or is rejected.
pub async fn update(
    client: &BackendClient,
    id: BannerId,
    patch: &BannerPatch,
) -> Result<Option<Banner>, BackendError> {
    let rows: Vec<Banner> = client
        .update(BANNERS, &Query::new().eq("id", id), patch, Auth::Service)
        .await?;
    Ok(rows.into_iter().next())
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn delete(client: &BackendClient, id: BannerId) -> Result<(), BackendError> {
    client
        .delete(BANNERS, &Query::new().eq("id", id), Auth::Service)
        .await
}
