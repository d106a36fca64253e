//! Application state shared across handlers.

use std::sync::Arc;

use vesture_backend::{BackendClient, BackendError};

use crate::config::StorefrontConfig;
use crate::services::CatalogService;
use crate::tryon::TryOnService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("try-on HTTP client: {0}")]
    TryOn(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    catalog: CatalogService,
    tryon: TryOnService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let catalog = CatalogService::new(backend.clone());
        let tryon = TryOnService::new(&config.tryon)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                catalog,
                tryon,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the hosted backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the cached catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the try-on service.
    #[must_use]
    pub fn tryon(&self) -> &TryOnService {
        &self.inner.tryon
    }
}
