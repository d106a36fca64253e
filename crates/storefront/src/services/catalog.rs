//! Cached catalog reads.
//!
//! Listing, search and faceting all work on the full active catalog, so the
//! catalog is fetched once and cached for five minutes. Banners share the
//! same cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};
use vesture_backend::{BackendClient, BackendError, repo};
use vesture_core::{Banner, Product, ProductId};

const ACTIVE_PRODUCTS_KEY: &str = "products:active";
const ACTIVE_BANNERS_KEY: &str = "banners:active";

/// Cached values.
#[derive(Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Banners(Arc<Vec<Banner>>),
}

/// Read-through cache over the public catalog tables.
#[derive(Clone)]
pub struct CatalogService {
    backend: BackendClient,
    cache: Cache<&'static str, CacheValue>,
}

impl CatalogService {
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { backend, cache }
    }

    /// All active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn active_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(ACTIVE_PRODUCTS_KEY).await {
            debug!("Cache hit for active products");
            return Ok(products);
        }

        let products = Arc::new(repo::products::list_active(&self.backend).await?);
        self.cache
            .insert(ACTIVE_PRODUCTS_KEY, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// An active product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let products = self.active_products().await?;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    /// Active banners in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn active_banners(&self) -> Result<Arc<Vec<Banner>>, BackendError> {
        if let Some(CacheValue::Banners(banners)) = self.cache.get(ACTIVE_BANNERS_KEY).await {
            debug!("Cache hit for active banners");
            return Ok(banners);
        }

        let banners = Arc::new(repo::banners::list_active(&self.backend).await?);
        self.cache
            .insert(ACTIVE_BANNERS_KEY, CacheValue::Banners(Arc::clone(&banners)))
            .await;
        Ok(banners)
    }
}
