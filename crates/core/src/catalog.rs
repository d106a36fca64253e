//! Product catalog: records, filter predicates, sorting and pagination.
//!
//! The storefront loads the active catalog once (cached) and narrows it in
//! memory. Every predicate here is a plain function of a [`Product`], so the
//! same filter produces the same list regardless of where it runs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::ProductId;

/// Deserialize `null` as the type's default (the backend returns `null` for
/// unset array and text columns).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

const fn default_true() -> bool {
    true
}

/// A product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub price: Decimal,
    /// Pre-discount price; the product is on sale when this exceeds `price`.
    #[serde(default)]
    pub original_price: Option<Decimal>,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sizes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub colors: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product is discounted.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }

    /// Discount as a whole percentage of the original price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price.filter(|_| self.is_on_sale())?;
        let percent = (original - self.price) / original * Decimal::ONE_HUNDRED;
        percent.round().to_u32()
    }

    /// Image shown on listing cards.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether the product offers `size` (case-insensitive).
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s.eq_ignore_ascii_case(size))
    }

    /// Whether the product offers `color` (case-insensitive).
    #[must_use]
    pub fn offers_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c.eq_ignore_ascii_case(color))
    }
}

// =============================================================================
// Filtering
// =============================================================================

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

/// Listing filter. An empty filter matches every active product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Free-text search over name, description, brand and category.
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    /// Product must offer at least one of these sizes.
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Product must offer at least one of these colors.
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub new_only: bool,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl ProductFilter {
    /// Whether `product` passes every predicate of this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        product.is_active
            && self.matches_search(product)
            && self.matches_category(product)
            && self.matches_brand(product)
            && self.matches_price(product)
            && (self.sizes.is_empty() || self.sizes.iter().any(|s| product.offers_size(s)))
            && (self.colors.is_empty() || self.colors.iter().any(|c| product.offers_color(c)))
            && (!self.on_sale || product.is_on_sale())
            && (!self.new_only || product.is_new)
            && (!self.in_stock_only || product.in_stock())
    }

    fn matches_search(&self, product: &Product) -> bool {
        let Some(term) = non_blank(self.search.as_deref()) else {
            return true;
        };
        let term = term.to_lowercase();

        [
            Some(product.name.as_str()),
            Some(product.description.as_str()),
            product.brand.as_deref(),
            Some(product.category.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_category(&self, product: &Product) -> bool {
        match non_blank(self.category.as_deref()) {
            None => true,
            Some(category) if category.eq_ignore_ascii_case(ALL_CATEGORIES) => true,
            Some(category) => product.category.eq_ignore_ascii_case(category),
        }
    }

    fn matches_brand(&self, product: &Product) -> bool {
        non_blank(self.brand.as_deref()).is_none_or(|brand| {
            product
                .brand
                .as_deref()
                .is_some_and(|b| b.eq_ignore_ascii_case(brand))
        })
    }

    fn matches_price(&self, product: &Product) -> bool {
        self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Sorting
// =============================================================================

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Featured products first, then newest.
    #[default]
    Featured,
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let newest = || b.created_at.cmp(&a.created_at);
        match self {
            Self::Featured => b.is_featured.cmp(&a.is_featured).then_with(newest),
            Self::Newest => newest(),
            Self::PriceAsc => a.price.cmp(&b.price).then_with(newest),
            Self::PriceDesc => b.price.cmp(&a.price).then_with(newest),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            _ => Err(format!("invalid sort: {s}")),
        }
    }
}

/// Filter and sort a catalog.
#[must_use]
pub fn apply(products: &[Product], filter: &ProductFilter, sort: ProductSort) -> Vec<Product> {
    let mut matched: Vec<Product> = products
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect();
    matched.sort_by(|a, b| sort.compare(a, b));
    matched
}

/// Active products in the same category as `product`, excluding it.
#[must_use]
pub fn related(products: &[Product], product: &Product, limit: usize) -> Vec<Product> {
    products
        .iter()
        .filter(|p| {
            p.is_active && p.id != product.id && p.category.eq_ignore_ascii_case(&product.category)
        })
        .take(limit)
        .cloned()
        .collect()
}

// =============================================================================
// Pagination
// =============================================================================

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 24;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Build a page request, clamping out-of-range values.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Items before this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.per_page as usize)
    }

    /// Cut this page out of `items`.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Paginated<T> {
        let total = items.len();
        let per_page = self.per_page as usize;
        let total_pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
        let skip = self.offset();

        Paginated {
            items: items.into_iter().skip(skip).take(per_page).collect(),
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages,
            has_next_page: self.page < total_pages,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_next_page: bool,
}

impl<T> Paginated<T> {
    /// Convert each item, keeping the page numbers.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
        }
    }
}

// =============================================================================
// Facets
// =============================================================================

/// Distinct values available for filtering, computed from active products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Collect filter facets. Values are deduplicated case-insensitively, keeping
/// the first spelling seen, and sorted alphabetically.
#[must_use]
pub fn facets(products: &[Product]) -> Facets {
    let active: Vec<&Product> = products.iter().filter(|p| p.is_active).collect();

    Facets {
        categories: distinct(active.iter().map(|p| p.category.as_str())),
        brands: distinct(active.iter().filter_map(|p| p.brand.as_deref())),
        sizes: distinct(active.iter().flat_map(|p| p.sizes.iter().map(String::as_str))),
        colors: distinct(active.iter().flat_map(|p| p.colors.iter().map(String::as_str))),
        min_price: active.iter().map(|p| p.price).min(),
        max_price: active.iter().map(|p| p.price).max(),
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        seen.entry(value.to_lowercase())
            .or_insert_with(|| value.to_string());
    }
    seen.into_values().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    pub(crate) fn product(name: &str, category: &str, price: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Decimal::from_str(price).unwrap(),
            original_price: None,
            category: category.to_string(),
            brand: None,
            images: vec![format!("https://cdn.test/{name}.jpg")],
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["Black".to_string()],
            stock: 10,
            is_new: false,
            is_featured: false,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn catalog() -> Vec<Product> {
        let mut dress = product("Linen Dress", "dresses", "89.00");
        dress.original_price = Some(Decimal::from_str("120.00").unwrap());
        dress.brand = Some("Maison".to_string());
        dress.colors = vec!["White".to_string()];

        let mut jeans = product("Slim Jeans", "bottoms", "59.50");
        jeans.sizes = vec!["L".to_string()];
        jeans.is_new = true;
        jeans.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut tee = product("Cotton Tee", "tops", "19.99");
        tee.is_featured = true;
        tee.stock = 0;

        let mut hidden = product("Archived Coat", "outerwear", "199.00");
        hidden.is_active = false;

        vec![dress, jeans, tee, hidden]
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_excludes_inactive() {
        let result = apply(&catalog(), &ProductFilter::default(), ProductSort::Name);
        assert_eq!(names(&result), ["Cotton Tee", "Linen Dress", "Slim Jeans"]);
    }

    #[test]
    fn test_search_matches_brand_and_description_case_insensitively() {
        let filter = ProductFilter {
            search: Some("MAISON".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &filter, ProductSort::Name)), ["Linen Dress"]);

        let filter = ProductFilter {
            search: Some("jeans desc".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &filter, ProductSort::Name)), ["Slim Jeans"]);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(apply(&catalog(), &filter, ProductSort::Name).len(), 3);
    }

    #[test]
    fn test_category_all_and_specific() {
        let all = ProductFilter {
            category: Some("All".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(apply(&catalog(), &all, ProductSort::Name).len(), 3);

        let tops = ProductFilter {
            category: Some("TOPS".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &tops, ProductSort::Name)), ["Cotton Tee"]);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let filter = ProductFilter {
            min_price: Some(Decimal::from_str("19.99").unwrap()),
            max_price: Some(Decimal::from_str("59.50").unwrap()),
            ..ProductFilter::default()
        };
        assert_eq!(
            names(&apply(&catalog(), &filter, ProductSort::PriceAsc)),
            ["Cotton Tee", "Slim Jeans"]
        );
    }

    #[test]
    fn test_size_and_color_any_of() {
        let filter = ProductFilter {
            sizes: vec!["l".to_string(), "XL".to_string()],
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &filter, ProductSort::Name)), ["Slim Jeans"]);

        let filter = ProductFilter {
            colors: vec!["white".to_string()],
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &filter, ProductSort::Name)), ["Linen Dress"]);
    }

    #[test]
    fn test_flags_narrow_the_list() {
        let sale = ProductFilter {
            on_sale: true,
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &sale, ProductSort::Name)), ["Linen Dress"]);

        let new = ProductFilter {
            new_only: true,
            ..ProductFilter::default()
        };
        assert_eq!(names(&apply(&catalog(), &new, ProductSort::Name)), ["Slim Jeans"]);

        let stocked = ProductFilter {
            in_stock_only: true,
            ..ProductFilter::default()
        };
        assert_eq!(
            names(&apply(&catalog(), &stocked, ProductSort::Name)),
            ["Linen Dress", "Slim Jeans"]
        );
    }

    #[test]
    fn test_combined_filters_only_narrow() {
        let base = ProductFilter {
            max_price: Some(Decimal::from_str("100").unwrap()),
            ..ProductFilter::default()
        };
        let narrower = ProductFilter {
            in_stock_only: true,
            ..base.clone()
        };
        let products = catalog();
        let wide = apply(&products, &base, ProductSort::Name);
        let narrow = apply(&products, &narrower, ProductSort::Name);
        assert!(narrow.len() < wide.len());
        assert!(narrow.iter().all(|p| wide.contains(p)));
    }

    #[test]
    fn test_sort_orders() {
        let all = ProductFilter::default();
        assert_eq!(
            names(&apply(&catalog(), &all, ProductSort::PriceDesc)),
            ["Linen Dress", "Slim Jeans", "Cotton Tee"]
        );
        assert_eq!(
            names(&apply(&catalog(), &all, ProductSort::Featured))[0],
            "Cotton Tee"
        );
        assert_eq!(
            names(&apply(&catalog(), &all, ProductSort::Newest))[0],
            "Slim Jeans"
        );
    }

    #[test]
    fn test_sale_helpers() {
        let catalog = catalog();
        let dress = &catalog[0];
        assert!(dress.is_on_sale());
        assert_eq!(dress.discount_percent(), Some(26));

        let tee = &catalog[2];
        assert!(!tee.is_on_sale());
        assert_eq!(tee.discount_percent(), None);
    }

    #[test]
    fn test_pagination() {
        let items: Vec<u32> = (1..=25).collect();
        let page = Page::new(Some(3), Some(10)).slice(items.clone());
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next_page);

        let second = Page::new(Some(2), Some(10)).slice(items.clone()).map(|n| n * 2);
        assert!(second.has_next_page);
        assert_eq!(second.items.first(), Some(&22));

        let beyond = Page::new(Some(9), Some(10)).slice(items);
        assert!(beyond.items.is_empty());

        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_facets() {
        let mut catalog = catalog();
        catalog[1].colors = vec!["Black".to_string(), "blue".to_string()];
        let facets = facets(&catalog);

        assert_eq!(facets.categories, ["bottoms", "dresses", "tops"]);
        assert_eq!(facets.brands, ["Maison"]);
        assert_eq!(facets.colors, ["Black", "blue", "White"]);
        assert_eq!(facets.min_price, Some(Decimal::from_str("19.99").unwrap()));
        assert_eq!(facets.max_price, Some(Decimal::from_str("89.00").unwrap()));
    }

    #[test]
    fn test_related_excludes_self_and_inactive() {
        let mut catalog = catalog();
        let mut second_dress = product("Silk Dress", "dresses", "150");
        second_dress.is_active = false;
        catalog.push(second_dress);
        catalog.push(product("Wrap Dress", "Dresses", "99"));

        let related = related(&catalog, &catalog[0], 4);
        assert_eq!(names(&related), ["Wrap Dress"]);
    }

    #[test]
    fn test_product_deserializes_nulls() {
        let json = r#"{
            "id": "6f2b3c1e-0000-4000-8000-000000000001",
            "name": "Scarf",
            "description": null,
            "price": 25.5,
            "original_price": null,
            "category": "accessories",
            "images": null,
            "sizes": null,
            "colors": ["Red"],
            "stock": 3,
            "created_at": "2024-03-01T12:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.description, "");
        assert!(product.images.is_empty());
        assert!(product.is_active);
        assert_eq!(product.price, Decimal::from_str("25.5").unwrap());
    }
}
