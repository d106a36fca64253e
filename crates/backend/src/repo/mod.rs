//! Typed table access.
//!
//! # Tables
//!
//! - `products` - Catalog (public read of active rows)
//! - `orders` - Orders with inline line items (owner read/insert, admin all)
//! - `profiles` - One row per auth user, carries the role
//! - `wardrobe_items` - Garments a user saved for try-ons
//! - `tryon_results` - Rendered try-on history
//! - `banners` - Home page hero banners
//! - `store_settings` - Key/value settings
//!
//! Each function takes the credential it runs under; row-level security on
//! the backend decides what a user token may see.

pub mod banners;
pub mod orders;
pub mod products;
pub mod profiles;
pub mod settings;
pub mod tryon_results;
pub mod wardrobe;

use serde::{Deserialize, Deserializer};

pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const PROFILES: &str = "profiles";
pub const WARDROBE_ITEMS: &str = "wardrobe_items";
pub const TRYON_RESULTS: &str = "tryon_results";
pub const BANNERS: &str = "banners";
pub const STORE_SETTINGS: &str = "store_settings";

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
/// in patch payloads.
pub(crate) fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
