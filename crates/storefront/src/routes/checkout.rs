//! Checkout: turn the session cart into a pending order.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vesture_backend::repo;
use vesture_core::{Cart, NewOrder, Order, OrderError, Product, ProductId, ShippingAddress};

use super::cart::{load_cart, reprice_cart, save_cart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
}

/// Every product's units, summed over its lines, must fit its stock.
fn check_cart_stock(cart: &Cart, products: &[Product]) -> Result<()> {
    for line in &cart.items {
        let stock = products
            .iter()
            .find(|p| p.id == line.product_id)
            .map_or(0, |p| p.stock);
        let wanted = cart.product_quantity(line.product_id, None);
        if i64::from(wanted) > i64::from(stock) {
            return Err(AppError::BadRequest(format!(
                "Only {stock} of {} left in stock",
                line.name
            )));
        }
    }
    Ok(())
}

/// Place an order for the cart's contents.
///
/// Prices are refreshed from the catalog first; lines whose product has
/// disappeared are dropped and the shopper has to confirm again.
#[instrument(skip(state, session, user, request), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let mut cart = load_cart(&session).await;
    if cart.is_empty() {
        return Err(OrderError::EmptyCart.into());
    }

    let removed = reprice_cart(&state, &mut cart).await?;
    if !removed.is_empty() {
        save_cart(&session, &cart).await?;
        let names: Vec<&str> = removed.iter().map(|line| line.name.as_str()).collect();
        return Err(AppError::BadRequest(format!(
            "No longer available: {}. Please review your cart.",
            names.join(", ")
        )));
    }

    // Stock is read fresh; the catalog cache may be minutes old
    let ids: Vec<ProductId> = cart.items.iter().map(|line| line.product_id).collect();
    let products = repo::products::active_by_ids(state.backend(), &ids).await?;
    check_cart_stock(&cart, &products)?;

    let new_order = NewOrder::from_cart(
        user.id,
        &cart,
        &state.config().shipping,
        request.shipping_address,
    )?;
    let order = repo::orders::create(state.backend(), &new_order, &user.access_token).await?;

    cart.clear();
    save_cart(&session, &cart).await?;

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

    Ok((StatusCode::CREATED, Json(order)))
}
