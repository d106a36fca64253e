//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with in-memory store)
//! 4. Rate limiting on `/auth/login`
//! 5. `RequireAdmin` extractor on every `/api` handler

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{RequireAdmin, clear_current_admin, set_current_admin};
pub use rate_limit::{ClientIpKeyExtractor, login_rate_limiter};
pub use session::create_session_layer;
