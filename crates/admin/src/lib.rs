//! Vesture admin library.
//!
//! This crate provides the back-office API as a library, allowing it to be
//! tested and reused.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access: the hosted backend's service key
//! bypasses row-level security. Bind it to a private interface.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
