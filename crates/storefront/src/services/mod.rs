//! Business logic services for storefront.
//!
//! - `catalog` - cached reads of the active catalog and banners

pub mod catalog;

pub use catalog::CatalogService;
