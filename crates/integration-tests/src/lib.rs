//! Integration tests for Vesture.
//!
//! Both binaries' routers are served on ephemeral ports against in-process
//! fakes of the hosted backend ([`fake_backend`]) and the try-on providers
//! ([`fake_tryon`]). No external services are needed:
//!
//! ```bash
//! cargo test -p vesture-integration-tests
//! ```
//!
//! # Test Files
//!
//! - `storefront_tryon` - try-on flows and error categories
//! - `storefront_cart_checkout` - session cart, sign-in and checkout
//! - `admin_api` - admin sign-in, order lifecycle, dashboard

pub mod fake_backend;
pub mod fake_tryon;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::SecretString;
use url::Url;
use vesture_admin::config::AdminConfig;
use vesture_backend::BackendConfig;
use vesture_core::ShippingPolicy;
use vesture_storefront::config::{ImageGenConfig, StorefrontConfig, TaskApiConfig, TryOnConfig};

/// PNG file signature.
pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// `png_base64(b"person")`, a tiny shopper photo.
pub const PERSON_PNG: &str = "iVBORw0KGgpwZXJzb24=";

/// A PNG signature followed by `tail`. Enough for content sniffing.
#[must_use]
pub fn png_bytes(tail: &[u8]) -> Vec<u8> {
    [PNG_MAGIC, tail].concat()
}

#[must_use]
pub fn png_base64(tail: &[u8]) -> String {
    STANDARD.encode(png_bytes(tail))
}

/// Serve `router` on 127.0.0.1 with an ephemeral port.
///
/// Connection info is attached so per-IP rate limiting can key on the peer.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server");
    });
    addr
}

/// HTTP client that keeps session cookies between requests.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("build test client")
}

fn backend_config(backend_url: &Url, with_service_key: bool) -> BackendConfig {
    BackendConfig {
        url: backend_url.clone(),
        anon_key: SecretString::from("test-anon-key"),
        service_role_key: with_service_key.then(|| SecretString::from("test-service-role-key")),
    }
}

/// Storefront settings pointing at the fakes, with a fast poll loop
/// (10ms, 3 attempts).
#[must_use]
pub fn storefront_config(backend_url: &Url, tryon_url: &Url) -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("loopback address"),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        backend: backend_config(backend_url, false),
        tryon: TryOnConfig {
            task_api: TaskApiConfig {
                base_url: tryon_url.clone(),
                api_key: Some(SecretString::from("test-task-key")),
                model: "kolors-virtual-try-on-v1-5".to_string(),
                poll_interval: Duration::from_millis(10),
                max_poll_attempts: 3,
            },
            image_gen: ImageGenConfig {
                base_url: tryon_url.clone(),
                api_key: Some(SecretString::from("test-image-key")),
                model: "test/image-model".to_string(),
            },
        },
        shipping: ShippingPolicy::default(),
        trust_proxy_headers: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

#[must_use]
pub fn admin_config(backend_url: &Url) -> AdminConfig {
    AdminConfig {
        host: "127.0.0.1".parse().expect("loopback address"),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        backend: backend_config(backend_url, true),
        low_stock_threshold: 5,
        trust_proxy_headers: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Serve the storefront and return its base URL.
pub async fn spawn_storefront(config: StorefrontConfig) -> String {
    let state =
        vesture_storefront::state::AppState::new(config).expect("build storefront state");
    let addr = serve(vesture_storefront::routes::app(state)).await;
    format!("http://{addr}")
}

/// Serve the admin API and return its base URL.
pub async fn spawn_admin(config: AdminConfig) -> String {
    let state = vesture_admin::state::AppState::new(config).expect("build admin state");
    let addr = serve(vesture_admin::routes::app(state)).await;
    format!("http://{addr}")
}
