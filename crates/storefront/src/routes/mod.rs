//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (backend reachable)
//!
//! # Catalog
//! GET    /api/products                - Filtered, sorted, paginated listing
//! GET    /api/products/facets         - Filter options
//! GET    /api/products/featured       - Featured strip
//! GET    /api/products/{id}           - Detail plus related products
//! GET    /api/banners                 - Active home page banners
//!
//! # Cart (session)
//! GET    /api/cart                    - Cart with refreshed prices and totals
//! POST   /api/cart/items              - Add a line
//! PATCH  /api/cart/items              - Set a line's quantity (0 removes)
//! DELETE /api/cart/items              - Remove a line
//! DELETE /api/cart                    - Empty the cart
//! GET    /api/cart/count              - Units in the cart
//!
//! # Checkout (requires auth)
//! POST   /api/checkout                - Place an order
//!
//! # Auth (rate limited)
//! POST   /api/auth/login
//! POST   /api/auth/signup
//! POST   /api/auth/logout
//! GET    /api/auth/me
//!
//! # Account (requires auth)
//! GET    /api/account/orders
//! GET    /api/account/orders/{id}
//! GET    /api/account/wardrobe
//! POST   /api/account/wardrobe
//! DELETE /api/account/wardrobe/{id}
//! GET    /api/account/try-ons
//!
//! # Try-on (rate limited)
//! POST   /functions/virtual-tryon
//! ```

pub mod account;
pub mod auth;
pub mod banners;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod tryon;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    ClientIpKeyExtractor, auth_rate_limiter, create_session_layer, request_id_middleware,
    tryon_rate_limiter,
};
use crate::state::AppState;

/// Try-on bodies carry up to three base64 images.
const TRYON_BODY_LIMIT: usize = 48 * 1024 * 1024;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/facets", get(products::facets))
        .route("/featured", get(products::featured))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route(
            "/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
        .route("/count", get(cart::count))
}

/// Create the auth routes router.
pub fn auth_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .layer(auth_rate_limiter(client_ip))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/wardrobe",
            get(account::wardrobe).post(account::add_to_wardrobe),
        )
        .route("/wardrobe/{id}", delete(account::remove_from_wardrobe))
        .route("/try-ons", get(account::try_ons))
}

/// Create the try-on routes router.
pub fn tryon_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/virtual-tryon", post(tryon::virtual_tryon))
        .layer(DefaultBodyLimit::max(TRYON_BODY_LIMIT))
        .layer(tryon_rate_limiter(client_ip))
}

/// Create all routes for the storefront.
///
/// `client_ip` keys the auth and try-on rate limiters.
pub fn routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/products", product_routes())
        .route("/api/banners", get(banners::index))
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::place_order))
        .nest("/api/auth", auth_routes(client_ip))
        .nest("/api/account", account_routes())
        .nest("/functions", tryon_routes(client_ip))
}

/// The complete application with middleware, ready to serve.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so rate
/// limiting can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let client_ip = ClientIpKeyExtractor::new(state.config().trust_proxy_headers);

    routes(client_ip)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the hosted backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
