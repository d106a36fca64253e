//! Product route handlers.
//!
//! Listing, search and facets are computed in memory over the cached active
//! catalog.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use vesture_core::catalog::{self, ALL_CATEGORIES};
use vesture_core::{
    Facets, Page, Paginated, Price, Product, ProductFilter, ProductId, ProductSort,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Products shown in the featured strip.
const FEATURED_LIMIT: usize = 8;

/// Related products shown on a detail page.
const RELATED_LIMIT: usize = 4;

/// Listing query string.
///
/// `sizes` and `colors` are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub in_stock: bool,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            category: self
                .category
                .clone()
                .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES)),
            brand: self.brand.clone().filter(|b| !b.is_empty()),
            min_price: self.min_price,
            max_price: self.max_price,
            sizes: split_list(self.sizes.as_deref()),
            colors: split_list(self.colors.as_deref()),
            on_sale: self.on_sale,
            new_only: self.new,
            in_stock_only: self.in_stock,
        }
    }

    fn sort(&self) -> Result<ProductSort> {
        match self.sort.as_deref() {
            None | Some("") => Ok(ProductSort::default()),
            Some(s) => s.parse().map_err(AppError::BadRequest),
        }
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Product plus derived display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// `price` formatted for display, e.g. `$12.50`.
    pub display_price: String,
    pub display_original_price: Option<String>,
    pub is_on_sale: bool,
    pub discount_percent: Option<u32>,
    pub in_stock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            display_price: Price::usd(product.price).display(),
            display_original_price: product
                .original_price
                .map(|amount| Price::usd(amount).display()),
            is_on_sale: product.is_on_sale(),
            discount_percent: product.discount_percent(),
            in_stock: product.in_stock(),
            product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: ProductView,
    pub related: Vec<ProductView>,
}

/// List products with filtering, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<ProductView>>> {
    let filter = query.filter();
    let sort = query.sort()?;
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(AppError::BadRequest(
            "min_price must not exceed max_price".to_string(),
        ));
    }

    let products = state.catalog().active_products().await?;
    let matched = catalog::apply(&products, &filter, sort);
    let page = Page::new(query.page, query.per_page).slice(matched);

    Ok(Json(page.map(ProductView::from)))
}

/// Filter options for the listing UI.
#[instrument(skip(state))]
pub async fn facets(State(state): State<AppState>) -> Result<Json<Facets>> {
    let products = state.catalog().active_products().await?;
    Ok(Json(catalog::facets(&products)))
}

/// Featured products, newest first.
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = state.catalog().active_products().await?;
    let featured = products
        .iter()
        .filter(|p| p.is_featured)
        .take(FEATURED_LIMIT)
        .cloned()
        .map(ProductView::from)
        .collect();
    Ok(Json(featured))
}

/// Product detail with related products from the same category.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let products = state.catalog().active_products().await?;
    let product = products
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let related = catalog::related(&products, &product, RELATED_LIMIT)
        .into_iter()
        .map(ProductView::from)
        .collect();

    Ok(Json(ProductDetail {
        product: product.into(),
        related,
    }))
}
