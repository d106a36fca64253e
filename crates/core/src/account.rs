//! Per-user records: profiles, saved wardrobe items and try-on history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, TryOnResultId, UserId, UserRole, WardrobeItemId};

/// A user's profile row. The id matches the auth user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Garment placement on the body, as understood by try-on providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryOnCategory {
    #[default]
    UpperBody,
    LowerBody,
    Dresses,
    /// Upper and lower garments applied one after the other.
    FullBody,
}

impl TryOnCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpperBody => "upper_body",
            Self::LowerBody => "lower_body",
            Self::Dresses => "dresses",
            Self::FullBody => "full_body",
        }
    }

    /// Suggested category for a catalog category name.
    #[must_use]
    pub fn for_product_category(category: &str) -> Self {
        match category.to_lowercase().as_str() {
            "bottoms" | "pants" | "jeans" | "skirts" | "shorts" => Self::LowerBody,
            "dresses" | "jumpsuits" => Self::Dresses,
            _ => Self::UpperBody,
        }
    }
}

/// Which third-party service renders the try-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryOnProvider {
    /// Task-based garment fitting API (create, poll, download).
    #[default]
    TaskApi,
    /// Chat-completion image generation with inline images.
    ImageGeneration,
}

impl TryOnProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskApi => "task_api",
            Self::ImageGeneration => "image_generation",
        }
    }
}

/// A garment a user saved for later try-ons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: WardrobeItemId,
    pub user_id: UserId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub name: String,
    pub image_url: String,
    pub category: TryOnCategory,
    pub created_at: DateTime<Utc>,
}

/// A rendered try-on kept in the user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryOnResult {
    pub id: TryOnResultId,
    pub user_id: UserId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub category: TryOnCategory,
    pub provider: TryOnProvider,
    /// Rendered image as a data URL.
    pub result_image: String,
    pub created_at: DateTime<Utc>,
}
