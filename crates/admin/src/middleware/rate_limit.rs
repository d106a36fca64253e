//! Rate limiting for the admin sign-in endpoint.
//!
//! Keyed by client IP with the storefront's [`ClientIpKeyExtractor`], so the
//! same `TRUST_PROXY_HEADERS` rule applies to both binaries.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

pub use vesture_storefront::middleware::ClientIpKeyExtractor;

pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Password sign-in: ~5 attempts per minute per IP, burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(12)` and `burst_size(5)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn login_rate_limiter(key: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key)
        .per_second(12)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(12) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}
