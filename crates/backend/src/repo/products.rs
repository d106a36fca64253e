//! Product rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vesture_core::{Product, ProductId};

use super::{PRODUCTS, explicit_null};
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

/// Rejected product input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductValidationError {
    #[error("name is required")]
    MissingName,
    #[error("category is required")]
    MissingCategory,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("stock must not be negative")]
    NegativeStock,
    #[error("original price must be greater than price")]
    OriginalPriceNotAbovePrice,
}

/// Insert payload for a new product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewProduct {
    /// Check required fields and price/stock bounds.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::MissingName);
        }
        if self.category.trim().is_empty() {
            return Err(ProductValidationError::MissingCategory);
        }
        check_amounts(Some(self.price), self.original_price, Some(self.stock))
    }
}

/// Partial update for a product. Absent fields are left unchanged;
/// `original_price: null` ends a sale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Option<Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProductPatch {
    /// Validate the patch against the row it will be applied to.
    ///
    /// # Errors
    ///
    /// Returns the first problem found in the merged result.
    pub fn validate(&self, current: &Product) -> Result<(), ProductValidationError> {
        if self.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ProductValidationError::MissingName);
        }
        if self.category.as_ref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ProductValidationError::MissingCategory);
        }
        let price = self.price.unwrap_or(current.price);
        let original_price = self.original_price.unwrap_or(current.original_price);
        check_amounts(Some(price), original_price, self.stock)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn check_amounts(
    price: Option<Decimal>,
    original_price: Option<Decimal>,
    stock: Option<i32>,
) -> Result<(), ProductValidationError> {
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err(ProductValidationError::NegativePrice);
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(ProductValidationError::NegativeStock);
    }
    match (price, original_price) {
        (Some(price), Some(original)) if original <= price => {
            Err(ProductValidationError::OriginalPriceNotAbovePrice)
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Queries
// =============================================================================

/// All active products, newest first. Public read.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_active(client: &BackendClient) -> Result<Vec<Product>, BackendError> {
    let query = Query::new()
        .eq("is_active", true)
        .order("created_at", Direction::Desc);
    client.select(PRODUCTS, &query, Auth::Anon).await
}

/// Active products with these ids, read fresh from the table.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn active_by_ids(
    client: &BackendClient,
    ids: &[ProductId],
) -> Result<Vec<Product>, BackendError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::new()
        .in_list("id", ids.iter())
        .eq("is_active", true);
    client.select(PRODUCTS, &query, Auth::Anon).await
}

/// Every product including inactive ones, optionally narrowed to names
/// containing `search` (case-insensitive).
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_all(
    client: &BackendClient,
    search: Option<&str>,
) -> Result<Vec<Product>, BackendError> {
    let mut query = Query::new().order("created_at", Direction::Desc);
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.ilike("name", term);
    }
    client.select(PRODUCTS, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn get(
    client: &BackendClient,
    id: ProductId,
    auth: Auth<'_>,
) -> Result<Option<Product>, BackendError> {
    client
        .select_one(PRODUCTS, &Query::new().eq("id", id), auth)
        .await
}

/// Products with stock below `threshold`, lowest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn low_stock(
    client: &BackendClient,
    threshold: i32,
) -> Result<Vec<Product>, BackendError> {
    let query = Query::new()
        .lt("stock", threshold)
        .eq("is_active", true)
        .order("stock", Direction::Asc);
    client.select(PRODUCTS, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails or the row is rejected.
pub async fn create(client: &BackendClient, product: &NewProduct) -> Result<Product, BackendError> {
    client.insert_one(PRODUCTS, product, Auth::Service).await
}

/// Apply `patch`; `None` when no row has this id.
///
/// # Errors
///
/// Returns an error if the request fails or the row is rejected.
pub async fn update(
    client: &BackendClient,
    id: ProductId,
    patch: &ProductPatch,
) -> Result<Option<Product>, BackendError> {
    let rows: Vec<Product> = client
        .update(PRODUCTS, &Query::new().eq("id", id), patch, Auth::Service)
        .await?;
    Ok(rows.into_iter().next())
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn delete(client: &BackendClient, id: ProductId) -> Result<(), BackendError> {
    client
        .delete(PRODUCTS, &Query::new().eq("id", id), Auth::Service)
        .await
}
