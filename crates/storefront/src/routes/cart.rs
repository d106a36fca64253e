//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Names, images and unit prices
//! always come from the catalog; the client only names the product, size,
//! color and quantity.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use vesture_core::{Cart, CartItem, CartTotals, LineKey, Price, Product, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Cart contents and totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
    /// Grand total formatted for display.
    pub display_total: String,
    /// Lines dropped because their product is no longer available.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<CartItem>,
}

impl CartView {
    fn new(cart: Cart, state: &AppState, removed: Vec<CartItem>) -> Self {
        let totals = cart.totals(&state.config().shipping);
        Self {
            items: cart.items,
            display_total: Price::usd(totals.total).display(),
            totals,
            removed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub line: LineKey,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u32,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the cart from the session. A missing or unreadable cart is empty.
pub(crate) async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart in the session.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Refresh prices from the catalog, dropping lines whose product is gone.
pub(crate) async fn reprice_cart(state: &AppState, cart: &mut Cart) -> Result<Vec<CartItem>> {
    let products = state.catalog().active_products().await?;
    Ok(cart.reprice(|id| products.iter().find(|p| p.id == id).map(|p| p.price)))
}

/// Match a requested option against the product's offered values, returning
/// the catalog spelling.
fn pick_option(
    requested: Option<&str>,
    offered: &[String],
    label: &str,
) -> Result<Option<String>> {
    match requested.map(str::trim).filter(|v| !v.is_empty()) {
        None if offered.is_empty() => Ok(None),
        None => Err(AppError::BadRequest(format!("Please choose a {label}"))),
        Some(value) => offered
            .iter()
            .find(|o| o.eq_ignore_ascii_case(value))
            .cloned()
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("{label} {value} is not available"))),
    }
}

fn line_for(product: &Product, request: &AddItemRequest) -> Result<CartItem> {
    Ok(CartItem {
        product_id: product.id,
        name: product.name.clone(),
        image: product.primary_image().map(String::from),
        unit_price: product.price,
        size: pick_option(request.size.as_deref(), &product.sizes, "size")?,
        color: pick_option(request.color.as_deref(), &product.colors, "color")?,
        quantity: request.quantity,
    })
}

fn check_stock(product: &Product, quantity: u32) -> Result<()> {
    if !product.in_stock() {
        return Err(AppError::BadRequest(format!("{} is out of stock", product.name)));
    }
    if i64::from(quantity) > i64::from(product.stock) {
        return Err(AppError::BadRequest(format!(
            "Only {} of {} left in stock",
            product.stock, product.name
        )));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart with current prices.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    let removed = reprice_cart(&state, &mut cart).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(cart, &state, removed)))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;

    let line = line_for(&product, &request)?;
    let mut cart = load_cart(&session).await;
    let in_cart = cart.product_quantity(product.id, None);
    check_stock(&product, in_cart.saturating_add(line.quantity))?;

    cart.add(line)?;
    save_cart(&session, &cart).await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(CartView::new(cart, &state, Vec::new())))
}

/// Change a line's quantity. Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    if request.quantity > 0 {
        let product = state
            .catalog()
            .product(request.line.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", request.line.product_id)))?;
        let other_lines = cart.product_quantity(product.id, Some(&request.line));
        check_stock(&product, other_lines.saturating_add(request.quantity))?;
    }

    cart.set_quantity(&request.line, request.quantity)?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(cart, &state, Vec::new())))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(line): Json<LineKey>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    cart.remove(&line)?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(cart, &state, Vec::new())))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    cart.clear();
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(cart, &state, Vec::new())))
}

/// Number of units in the cart, for the header badge.
pub async fn count(session: Session) -> Json<CartCount> {
    let cart = load_cart(&session).await;
    Json(CartCount {
        count: cart.item_count(),
    })
}
