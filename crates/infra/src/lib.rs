//! Infrastructure layer: persistence backends and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use store::{
    CategoryStore, InMemoryCatalogStore, Pagination, PostgresCatalogStore, ProductPage,
    ProductQuery, ProductStore, SortField, SortOrder, StoreError, StoreResult,
};
