//! Product management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;
use vesture_backend::repo::products::{NewProduct, ProductPatch};
use vesture_backend::{Auth, repo};
use vesture_core::{Product, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// Every product, active or not. `?search=` matches names.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = repo::products::list_all(state.backend(), query.search.as_deref()).await?;
    Ok(Json(products))
}

/// Product detail.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    repo::products::get(state.backend(), id, Auth::Service)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Create a product.
#[instrument(skip(state, admin, product), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    product.validate()?;
    let created = repo::products::create(state.backend(), &product).await?;
    tracing::info!(product_id = %created.id, name = %created.name, "Product created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Apply a partial update.
#[instrument(skip(state, admin, patch), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let current = repo::products::get(state.backend(), id, Auth::Service)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    patch.validate(&current)?;

    let updated = repo::products::update(state.backend(), id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(updated))
}

/// Delete a product.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    repo::products::delete(state.backend(), id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
