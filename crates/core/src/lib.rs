//! `catalog-core` — shared building blocks for the catalog crates.
//!
//! Typed identifiers and the domain error model. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, ProductId, VariantId};
