//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (backend reachable)
//!
//! # Auth (admin profiles only)
//! POST   /auth/login                  - Rate limited
//! POST   /auth/logout
//!
//! # Everything below requires an admin session
//! GET    /api/dashboard               - Counts, revenue, orders by status, low stock
//!
//! GET    /api/products                - All products
//! POST   /api/products                - Create
//! GET    /api/products/{id}
//! PATCH  /api/products/{id}           - Partial update
//! DELETE /api/products/{id}
//!
//! GET    /api/orders?status=          - All orders
//! GET    /api/orders/{id}
//! PATCH  /api/orders/{id}/status      - Lifecycle transition
//!
//! GET    /api/users                   - All profiles
//! PATCH  /api/users/{id}/role
//!
//! GET    /api/banners
//! POST   /api/banners
//! PATCH  /api/banners/{id}
//! DELETE /api/banners/{id}
//!
//! GET    /api/settings
//! GET    /api/settings/{key}
//! PUT    /api/settings/{key}
//! ```

pub mod auth;
pub mod banners;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{ClientIpKeyExtractor, create_session_layer, login_rate_limiter};
use crate::state::AppState;

/// Create the `/api` router. Every handler takes `RequireAdmin`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::index))
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/users", get(users::index))
        .route("/users/{id}/role", patch(users::set_role))
        .route("/banners", get(banners::index).post(banners::create))
        .route(
            "/banners/{id}",
            patch(banners::update).delete(banners::delete),
        )
        .route("/settings", get(settings::index))
        .route("/settings/{key}", get(settings::show).put(settings::update))
}

/// Create all routes for the admin panel.
///
/// `client_ip` keys the sign-in rate limiter.
pub fn routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    let login = Router::new()
        .route("/auth/login", post(auth::login))
        .layer(login_rate_limiter(client_ip));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(login)
        .route("/auth/logout", post(auth::logout))
        .nest("/api", api_routes())
}

/// The complete application with middleware, ready to serve.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// sign-in limiter can key on the peer address.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let client_ip = ClientIpKeyExtractor::new(state.config().trust_proxy_headers);

    routes(client_ip)
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;

    #[tokio::test]
    async fn test_health() {
        let state = AppState::new(test_config()).unwrap();
        let response = app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_admin_session() {
        let state = AppState::new(test_config()).unwrap();
        for path in ["/api/dashboard", "/api/orders", "/api/settings"] {
            let response = app(state.clone())
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        }
    }

    #[tokio::test]
    async fn test_state_requires_service_key() {
        let mut config = test_config();
        config.backend.service_role_key = None;
        assert!(AppState::new(config).is_err());
    }
}
