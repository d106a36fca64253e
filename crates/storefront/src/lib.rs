//! Vesture storefront library.
//!
//! The public shop API: catalog browsing, session cart, checkout, the
//! shopper's account and the virtual try-on function. Exposed as a library
//! so the router can be driven from integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod tryon;
