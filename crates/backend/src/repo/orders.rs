//! Order rows.
//!
//! Line items are stored inline in the `items` JSON column, so placing an
//! order is a single insert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vesture_core::{NewOrder, Order, OrderId, OrderStatus, Page, UserId};

use super::ORDERS;
use crate::client::{Auth, BackendClient};
use crate::error::BackendError;
use crate::query::{Direction, Query};

#[derive(Serialize)]
struct StatusPatch {
    status: OrderStatus,
    updated_at: DateTime<Utc>,
}

/// Insert a new order as the signed-in shopper.
///
/// # Errors
///
/// Returns an error if the request fails or row-level security rejects it.
pub async fn create(
    client: &BackendClient,
    order: &NewOrder,
    access_token: &str,
) -> Result<Order, BackendError> {
    client
        .insert_one(ORDERS, order, Auth::User(access_token))
        .await
}

/// A shopper's orders, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_for_user(
    client: &BackendClient,
    user_id: UserId,
    access_token: &str,
) -> Result<Vec<Order>, BackendError> {
    let query = Query::new()
        .eq("user_id", user_id)
        .order("created_at", Direction::Desc);
    client
        .select(ORDERS, &query, Auth::User(access_token))
        .await
}

/// One of a shopper's orders. `None` if it does not exist or belongs to
/// someone else.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn get_for_user(
    client: &BackendClient,
    id: OrderId,
    user_id: UserId,
    access_token: &str,
) -> Result<Option<Order>, BackendError> {
    let query = Query::new().eq("id", id).eq("user_id", user_id);
    client
        .select_one(ORDERS, &query, Auth::User(access_token))
        .await
}

/// Every order, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_all(client: &BackendClient) -> Result<Vec<Order>, BackendError> {
    let query = Query::new().order("created_at", Direction::Desc);
    client.select(ORDERS, &query, Auth::Service).await
}

/// One page of orders, optionally narrowed to one status, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_page(
    client: &BackendClient,
    status: Option<OrderStatus>,
    page: Page,
) -> Result<Vec<Order>, BackendError> {
    let mut query = Query::new()
        .order("created_at", Direction::Desc)
        .limit(page.per_page as usize)
        .offset(page.offset());
    if let Some(status) = status {
        query = query.eq("status", status);
    }
    client.select(ORDERS, &query, Auth::Service).await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn get(client: &BackendClient, id: OrderId) -> Result<Option<Order>, BackendError> {
    client
        .select_one(ORDERS, &Query::new().eq("id", id), Auth::Service)
        .await
}

/// Move an order from `from` to `to`.
///
/// The update is conditional on the row still being in `from`, so a
/// concurrent change makes this return `None` instead of overwriting it.
/// Callers check `from.can_transition_to(to)` first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn update_status(
    client: &BackendClient,
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Option<Order>, BackendError> {
    let query = Query::new().eq("id", id).eq("status", from);
    let patch = StatusPatch {
        status: to,
        updated_at: Utc::now(),
    };
    let rows: Vec<Order> = client
        .update(ORDERS, &query, &patch, Auth::Service)
        .await?;
    Ok(rows.into_iter().next())
}
