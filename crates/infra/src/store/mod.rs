//! Catalog persistence: product and category stores.
//!
//! Two backends implement the same async traits:
//! - [`InMemoryCatalogStore`] for tests/dev
//! - [`PostgresCatalogStore`] for persistent deployments
//!
//! Both resolve a product's category at read time, so a product whose category
//! has disappeared comes back with `category: None` rather than failing.

pub mod in_memory;
pub mod postgres;
pub mod query;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use catalog_core::{CategoryId, ProductId};
use catalog_products::{Category, Product, ResolvedProduct};

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use query::{Pagination, ProductPage, ProductQuery, SortField, SortOrder};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness rule was violated (duplicate SKU, duplicate id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The backend itself failed (connection, query, decoding).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Product persistence.
#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    /// Filtered, sorted, paginated listing.
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ResolvedProduct>>;

    /// Insert a new product; SKUs must be unique across the catalog.
    async fn insert_product(&self, product: Product) -> StoreResult<()>;

    /// Replace an existing product; `NotFound` if it does not exist.
    async fn update_product(&self, product: Product) -> StoreResult<()>;

    /// Returns `false` if nothing was deleted.
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    /// Snapshot of every active product with its category resolved, in
    /// creation order.
    async fn find_active_with_category(&self) -> StoreResult<Vec<ResolvedProduct>>;

    /// Number of products (active or not) referencing `category`.
    async fn count_products_in_category(&self, category: CategoryId) -> StoreResult<u64>;
}

/// Category persistence.
#[async_trait::async_trait]
pub trait CategoryStore: Send + Sync {
    /// Active categories, sorted by name.
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>>;

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    /// Insert a new category; `InvalidReference` if the parent does not exist.
    async fn insert_category(&self, category: Category) -> StoreResult<()>;

    /// Replace an existing category; `NotFound` if it does not exist.
    async fn update_category(&self, category: Category) -> StoreResult<()>;

    /// Delete a category. Children keep existing with their parent cleared.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;

    /// Child → parent edges of the whole tree (used for cycle checks).
    async fn category_parents(&self) -> StoreResult<HashMap<CategoryId, CategoryId>>;
}

#[async_trait::async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
        (**self).list_products(query).await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ResolvedProduct>> {
        (**self).get_product(id).await
    }

    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        (**self).insert_product(product).await
    }

    async fn update_product(&self, product: Product) -> StoreResult<()> {
        (**self).update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        (**self).delete_product(id).await
    }

    async fn find_active_with_category(&self) -> StoreResult<Vec<ResolvedProduct>> {
        (**self).find_active_with_category().await
    }

    async fn count_products_in_category(&self, category: CategoryId) -> StoreResult<u64> {
        (**self).count_products_in_category(category).await
    }
}

#[async_trait::async_trait]
impl<S> CategoryStore for Arc<S>
where
    S: CategoryStore + ?Sized,
{
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        (**self).list_active_categories().await
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        (**self).get_category(id).await
    }

    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        (**self).insert_category(category).await
    }

    async fn update_category(&self, category: Category) -> StoreResult<()> {
        (**self).update_category(category).await
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        (**self).delete_category(id).await
    }

    async fn category_parents(&self) -> StoreResult<HashMap<CategoryId, CategoryId>> {
        (**self).category_parents().await
    }
}
