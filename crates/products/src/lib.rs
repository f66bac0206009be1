//! Catalog domain: products, their variants, and categories.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Input payloads are validated
//! into drafts here; stores persist the resulting entities.

pub mod category;
pub mod product;

pub use category::{
    Category, CategoryDraft, CategoryInput, CategoryRef, MAX_CATEGORY_DEPTH, ensure_acyclic,
};
pub use product::{
    Product, ProductDraft, ProductInput, ResolvedProduct, Variant, VariantDraft, VariantInput,
};
