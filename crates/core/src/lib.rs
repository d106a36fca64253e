//! Vesture Core - Shared domain types.
//!
//! This crate provides the types used across all Vesture components:
//! - `storefront` - Public-facing fashion storefront with virtual try-on
//! - `admin` - Back-office for products, orders, users, banners and settings
//! - `backend` - Client for the hosted backend that stores all of the above
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Records mirror the hosted backend's tables; invariants the backend
//! enforces (foreign keys, row-level security) are not re-checked here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses
//! - [`catalog`] - Products, filters, sorting, pagination and facets
//! - [`cart`] - Cart lines and totals
//! - [`order`] - Orders and shipping addresses
//! - [`account`] - Profiles, wardrobe items and try-on history
//! - [`content`] - Home page banners and store settings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod order;
pub mod types;

pub use account::{Profile, TryOnCategory, TryOnProvider, TryOnResult, WardrobeItem};
pub use cart::{Cart, CartError, CartItem, CartTotals, LineKey, MAX_LINE_QUANTITY, ShippingPolicy};
pub use catalog::{Facets, Page, Paginated, Product, ProductFilter, ProductSort};
pub use content::{Banner, StoreSetting};
pub use order::{AddressError, NewOrder, Order, OrderError, OrderItem, ShippingAddress};
pub use types::*;
