//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::addresses::AddressService;
use crate::services::blobs::BlobStore;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::notify::Notifier;
use crate::store::Stores;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; hands out per-request service instances over
/// the shared store handles.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    blobs: Arc<dyn BlobStore>,
    notifier: Notifier,
    /// Present only on the postgres backend; used by the readiness check.
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        stores: Stores,
        blobs: Arc<dyn BlobStore>,
        notifier: Notifier,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                blobs,
                notifier,
                pool,
            }),
        }
    }

    /// The `PostgreSQL` pool, when running on the postgres backend.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// The API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The store bundle.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// The blob store for uploaded assets.
    #[must_use]
    pub fn blobs(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.inner.blobs)
    }

    /// The outbound notification sender.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Catalog administration service.
    #[must_use]
    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(
            Arc::clone(&self.inner.stores.catalog),
            Arc::clone(&self.inner.stores.stock),
            Arc::clone(&self.inner.blobs),
        )
    }

    /// Cart service.
    #[must_use]
    pub fn cart_service(&self) -> CartService {
        CartService::new(
            Arc::clone(&self.inner.stores.catalog),
            Arc::clone(&self.inner.stores.carts),
        )
    }

    /// Address book service.
    #[must_use]
    pub fn address_service(&self) -> AddressService {
        AddressService::new(Arc::clone(&self.inner.stores.addresses))
    }

    /// Checkout service.
    #[must_use]
    pub fn checkout_service(&self) -> CheckoutService {
        CheckoutService::new(
            Arc::clone(&self.inner.stores.catalog),
            Arc::clone(&self.inner.stores.orders),
            self.inner.notifier.clone(),
        )
    }
}
