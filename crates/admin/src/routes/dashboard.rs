//! Dashboard route handler.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;
use vesture_backend::repo;
use vesture_core::{Order, OrderStatus, Product, ProductId, UserRole};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Dashboard metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub active_products: usize,
    pub total_orders: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub customers: usize,
    pub low_stock: Vec<LowStockProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

impl From<Product> for LowStockProduct {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            stock: product.stock,
        }
    }
}

/// Order revenue, skipping cancelled orders.
fn revenue(orders: &[Order]) -> Decimal {
    orders
        .iter()
        .filter(|order| order.status != OrderStatus::Cancelled)
        .map(|order| order.total)
        .sum()
}

/// One entry per status in lifecycle order, zero counts included.
fn orders_by_status(orders: &[Order]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: orders.iter().filter(|order| order.status == status).count(),
        })
        .collect()
}

/// Store overview.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let backend = state.backend();
    let (products, orders, customers, low_stock) = tokio::try_join!(
        repo::products::list_all(backend, None),
        repo::orders::list_all(backend),
        repo::profiles::count_by_role(backend, UserRole::Customer),
        repo::products::low_stock(backend, state.config().low_stock_threshold),
    )?;

    Ok(Json(DashboardStats {
        total_products: products.len(),
        active_products: products.iter().filter(|p| p.is_active).count(),
        total_orders: orders.len(),
        revenue: revenue(&orders),
        orders_by_status: orders_by_status(&orders),
        customers,
        low_stock: low_stock.into_iter().map(LowStockProduct::from).collect(),
    }))
}
