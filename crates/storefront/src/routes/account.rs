//! Account route handlers.
//!
//! These routes require authentication and run under the shopper's own
//! access token, so row-level security scopes every read to their rows.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;
use vesture_backend::repo;
use vesture_backend::repo::wardrobe::NewWardrobeItem;
use vesture_core::{
    Order, OrderId, ProductId, TryOnCategory, TryOnResult, WardrobeItem, WardrobeItemId,
};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Longest accepted wardrobe item name.
const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct AddWardrobeItemRequest {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub name: String,
    pub image_url: String,
    #[serde(default)]
    pub category: Option<TryOnCategory>,
}

impl AddWardrobeItemRequest {
    fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::BadRequest(format!(
                "name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        let valid_url = url::Url::parse(self.image_url.trim())
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if !valid_url {
            return Err(AppError::BadRequest(
                "image_url must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }
}

/// The shopper's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = repo::orders::list_for_user(state.backend(), user.id, &user.access_token).await?;
    Ok(Json(orders))
}

/// One of the shopper's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    repo::orders::get_for_user(state.backend(), id, user.id, &user.access_token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Saved wardrobe items, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn wardrobe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WardrobeItem>>> {
    let items = repo::wardrobe::list_for_user(state.backend(), user.id, &user.access_token).await?;
    Ok(Json(items))
}

/// Save a garment to the wardrobe.
///
/// Without an explicit category, one is derived from the linked product's
/// catalog category, defaulting to upper body.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_to_wardrobe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddWardrobeItemRequest>,
) -> Result<(StatusCode, Json<WardrobeItem>)> {
    request.validate()?;

    let category = match (request.category, request.product_id) {
        (Some(category), _) => category,
        (None, Some(product_id)) => state
            .catalog()
            .product(product_id)
            .await?
            .map_or(TryOnCategory::UpperBody, |p| {
                TryOnCategory::for_product_category(&p.category)
            }),
        (None, None) => TryOnCategory::UpperBody,
    };

    let item = NewWardrobeItem {
        user_id: user.id,
        product_id: request.product_id,
        name: request.name.trim().to_string(),
        image_url: request.image_url.trim().to_string(),
        category,
    };
    let saved = repo::wardrobe::add(state.backend(), &item, &user.access_token).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Remove a wardrobe item.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_from_wardrobe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<WardrobeItemId>,
) -> Result<StatusCode> {
    repo::wardrobe::remove(state.backend(), id, user.id, &user.access_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recent try-on results.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn try_ons(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<TryOnResult>>> {
    let results =
        repo::tryon_results::list_for_user(state.backend(), user.id, &user.access_token).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, image_url: &str) -> AddWardrobeItemRequest {
        AddWardrobeItemRequest {
            product_id: None,
            name: name.to_string(),
            image_url: image_url.to_string(),
            category: None,
        }
    }

    #[test]
    fn test_wardrobe_request_validation() {
        assert!(request("Denim jacket", "https://cdn.test/j.jpg").validate().is_ok());
        assert!(request("  ", "https://cdn.test/j.jpg").validate().is_err());
        assert!(request("Jacket", "javascript:alert(1)").validate().is_err());
        assert!(request(&"x".repeat(201), "https://cdn.test/j.jpg").validate().is_err());
    }
}
