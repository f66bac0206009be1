use std::sync::Arc;

use catalog_core::CategoryId;
use catalog_infra::{
    AppConfig, CategoryStore, InMemoryCatalogStore, PostgresCatalogStore, ProductStore,
    StoreBackend, StoreResult,
};
use catalog_products::{Category, CategoryRef};

/// Shared handles used by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<dyn ProductStore>,
    pub categories: Arc<dyn CategoryStore>,
    /// Threshold applied when a low-stock request gives none.
    pub low_stock_default_threshold: i64,
}

impl AppServices {
    /// In-memory stores (tests/dev).
    pub fn in_memory(low_stock_default_threshold: i64) -> Self {
        let store = Arc::new(InMemoryCatalogStore::new());
        Self {
            products: store.clone(),
            categories: store,
            low_stock_default_threshold,
        }
    }

    /// Build services for the configured backend.
    ///
    /// The Postgres backend connects and applies the schema before returning.
    pub async fn from_config(config: &AppConfig) -> StoreResult<Self> {
        match &config.backend {
            StoreBackend::InMemory => {
                tracing::info!("using in-memory catalog store");
                Ok(Self::in_memory(config.low_stock_default_threshold))
            }
            StoreBackend::Postgres {
                database_url,
                max_connections,
            } => {
                tracing::info!(max_connections, "using postgres catalog store");
                let store = Arc::new(PostgresCatalogStore::connect(database_url, *max_connections).await?);
                store.migrate().await?;
                Ok(Self {
                    products: store.clone(),
                    categories: store,
                    low_stock_default_threshold: config.low_stock_default_threshold,
                })
            }
        }
    }

    /// Look up the parent of `category` as a `{ _id, name }` reference.
    pub async fn parent_ref(&self, category: &Category) -> StoreResult<Option<CategoryRef>> {
        match category.parent {
            Some(parent) => self.category_ref(parent).await,
            None => Ok(None),
        }
    }

    pub async fn category_ref(&self, id: CategoryId) -> StoreResult<Option<CategoryRef>> {
        Ok(self
            .categories
            .get_category(id)
            .await?
            .map(|c| c.to_ref()))
    }
}
