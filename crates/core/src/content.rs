//! Merchandising content managed from the admin: banners and store settings.

use serde::{Deserialize, Serialize};

use crate::types::BannerId;

/// A home page hero banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    /// Display order, ascending.
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_active: bool,
}

/// Active banners in display order.
#[must_use]
pub fn active_banners(mut banners: Vec<Banner>) -> Vec<Banner> {
    banners.retain(|banner| banner.is_active);
    banners.sort_by_key(|banner| banner.position);
    banners
}

/// A key/value store setting (announcement bar text, contact email, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSetting {
    pub key: String,
    pub value: serde_json::Value,
}
