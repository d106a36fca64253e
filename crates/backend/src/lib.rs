//! Vesture Backend - Hosted backend client.
//!
//! All persistence, authentication and row-level authorization live in a
//! hosted backend-as-a-service. This crate is the only code that talks to it.
//!
//! # APIs
//!
//! - **Tables** (`/rest/v1/{table}`): PostgREST-style CRUD, filtered with [`Query`]
//! - **Auth** (`/auth/v1/*`): password sign-in, sign-up, token refresh, user lookup
//!
//! # Credentials
//!
//! Every call names the credential it runs under via [`Auth`]:
//! - `Auth::Anon` - public reads (active catalog, banners)
//! - `Auth::User(token)` - a shopper's own rows, checked by row-level security
//! - `Auth::Service` - back-office access that bypasses row-level security
//!
//! # Example
//!
//! ```rust,ignore
//! use vesture_backend::{Auth, BackendClient, Query, repo};
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products = repo::products::list_active(&client).await?;
//! let orders = client
//!     .select::<Order>("orders", &Query::new().eq("user_id", user_id), Auth::User(&token))
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod repo;

pub use auth::{AuthSession, AuthUser, SignUpOutcome};
pub use client::{Auth, BackendClient};
pub use config::{BackendConfig, ConfigError};
pub use error::BackendError;
pub use query::{Direction, Query};
