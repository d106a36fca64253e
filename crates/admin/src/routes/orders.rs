//! Order management route handlers.
//!
//! Status changes follow the order lifecycle:
//!
//! ```text
//! pending ──> processing ──> shipped ──> delivered
//!    │             │
//!    └─────────────┴──> cancelled
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;
use vesture_backend::repo;
use vesture_core::{Order, OrderId, OrderStatus, Page};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.trim().parse().map_err(AppError::BadRequest)
}

/// Check a requested move against the lifecycle.
fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if from.is_terminal() {
        Err(AppError::Conflict(format!("Order is already {from}")))
    } else if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Cannot move an order from {from} to {to}"
        )))
    }
}

/// Orders newest first, paged with `?page=&per_page=` and optionally
/// filtered by `?status=`.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .transpose()?;
    let page = Page::new(query.page, query.per_page);
    let orders = repo::orders::list_page(state.backend(), status, page).await?;
    Ok(Json(orders))
}

/// Order detail.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    repo::orders::get(state.backend(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Move an order to a new status.
///
/// Returns 409 Conflict when the lifecycle does not allow the move, or when
/// the order changed status while the request was in flight.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let to = parse_status(&request.status)?;
    let order = repo::orders::get(state.backend(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let from = order.status;
    check_transition(from, to)?;

    let updated = repo::orders::update_status(state.backend(), id, from, to)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Order was modified concurrently, reload and retry".to_string())
        })?;

    tracing::info!(order_id = %id, %from, %to, "Order status changed");
    Ok(Json(updated))
}
