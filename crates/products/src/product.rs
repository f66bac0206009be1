use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, VariantId};

use crate::category::CategoryRef;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 1000;
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// A purchasable configuration of a product (size, color, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(rename = "_id")]
    pub id: VariantId,
    pub name: String,
    pub value: String,
    pub price: Decimal,
    pub stock: i64,
    pub sku: String,
}

impl Variant {
    /// Display label used by reports, e.g. `"Size: Large"`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: CategoryId,
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    pub variants: Vec<Variant>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    /// Build a new product from a validated draft.
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            base_price: draft.base_price,
            discount_percentage: draft.discount_percentage,
            variants: draft.variants.into_iter().map(VariantDraft::into_variant).collect(),
            images: draft.images,
            tags: draft.tags,
            is_active: draft.is_active,
            featured: draft.featured,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the mutable fields with a validated draft.
    ///
    /// Variants that carry an existing id keep it; the rest get fresh ids.
    pub fn apply_update(&mut self, draft: ProductDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.category = draft.category;
        self.base_price = draft.base_price;
        self.discount_percentage = draft.discount_percentage;
        self.variants = draft.variants.into_iter().map(VariantDraft::into_variant).collect();
        self.images = draft.images;
        self.tags = draft.tags;
        self.is_active = draft.is_active;
        self.featured = draft.featured;
        self.updated_at = now;
    }

    /// `basePrice * (1 - discountPercentage / 100)`.
    pub fn final_price(&self) -> Decimal {
        self.base_price * (Decimal::ONE - self.discount_percentage / Decimal::ONE_HUNDRED)
    }

    pub fn variant(&self, variant_id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Sum of all variant stock (0 for a variantless product).
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// Set the absolute stock count of one variant.
    pub fn set_variant_stock(
        &mut self,
        variant_id: VariantId,
        stock: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if stock < 0 {
            return Err(DomainError::validation("Stock cannot be negative"));
        }
        let variant = self
            .variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .ok_or_else(DomainError::not_found)?;
        variant.stock = stock;
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive substring match over name, description and tags.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// A product together with its category as resolved by the store.
///
/// `category` is `None` when the referenced category no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub product: Product,
    pub category: Option<CategoryRef>,
}

impl ResolvedProduct {
    pub fn new(product: Product, category: Option<CategoryRef>) -> Self {
        Self { product, category }
    }
}

// -------------------------
// Input + validation
// -------------------------

/// Raw product payload as received over the wire.
///
/// Every field is optional so that missing fields surface as validation
/// messages instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub sku: Option<String>,
}

/// Validated product fields, ready to be turned into a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category: CategoryId,
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    pub variants: Vec<VariantDraft>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub featured: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDraft {
    pub id: Option<VariantId>,
    pub name: String,
    pub value: String,
    pub price: Decimal,
    pub stock: i64,
    pub sku: String,
}

impl VariantDraft {
    fn into_variant(self) -> Variant {
        Variant {
            id: self.id.unwrap_or_default(),
            name: self.name,
            value: self.value,
            price: self.price,
            stock: self.stock,
            sku: self.sku,
        }
    }
}

impl ProductInput {
    /// Validate the payload, collecting every failing rule.
    pub fn validate(self) -> DomainResult<ProductDraft> {
        let mut errors = Vec::new();

        let name = required_text(&mut errors, "name", self.name, NAME_MIN, NAME_MAX);
        let description = required_text(
            &mut errors,
            "description",
            self.description,
            DESCRIPTION_MIN,
            DESCRIPTION_MAX,
        );

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("category is required".to_string());
                None
            }
            Some(raw) => match raw.parse::<CategoryId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("category must be a valid id".to_string());
                    None
                }
            },
        };

        let base_price = match self.base_price {
            None => {
                errors.push("basePrice is required".to_string());
                None
            }
            Some(p) if p < Decimal::ZERO => {
                errors.push("basePrice must be greater than or equal to 0".to_string());
                None
            }
            Some(p) => Some(p),
        };

        let discount_percentage = self.discount_percentage.unwrap_or(Decimal::ZERO);
        if discount_percentage < Decimal::ZERO || discount_percentage > Decimal::ONE_HUNDRED {
            errors.push("discountPercentage must be between 0 and 100".to_string());
        }

        let mut variants = Vec::with_capacity(self.variants.len());
        for (idx, input) in self.variants.into_iter().enumerate() {
            if let Some(v) = validate_variant(&mut errors, idx, input) {
                variants.push(v);
            }
        }

        for (idx, image) in self.images.iter().enumerate() {
            if !is_valid_image_url(image) {
                errors.push(format!("images[{idx}] must be a valid image URL"));
            }
        }

        let tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if !errors.is_empty() {
            return Err(DomainError::validation_many(errors));
        }

        match (name, description, category, base_price) {
            (Some(name), Some(description), Some(category), Some(base_price)) => Ok(ProductDraft {
                name,
                description,
                category,
                base_price,
                discount_percentage,
                variants,
                images: self.images,
                tags,
                featured: self.featured.unwrap_or(false),
                is_active: self.is_active.unwrap_or(true),
            }),
            _ => Err(DomainError::validation("invalid product payload")),
        }
    }
}

fn validate_variant(errors: &mut Vec<String>, idx: usize, input: VariantInput) -> Option<VariantDraft> {
    let before = errors.len();
    let field = |name: &str| format!("variants[{idx}].{name}");

    let id = match input.id.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<VariantId>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(format!("{} must be a valid id", field("_id")));
                None
            }
        },
    };

    let mut non_empty = |name: &str, value: Option<String>| -> String {
        let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
        if value.is_empty() {
            errors.push(format!("{} is required", field(name)));
        }
        value
    };
    let name = non_empty("name", input.name);
    let value = non_empty("value", input.value);
    let sku = non_empty("sku", input.sku);

    let price = match input.price {
        None => {
            errors.push(format!("{} is required", field("price")));
            Decimal::ZERO
        }
        Some(p) if p < Decimal::ZERO => {
            errors.push(format!("{} must be greater than or equal to 0", field("price")));
            p
        }
        Some(p) => p,
    };

    let stock = match input.stock {
        None => {
            errors.push(format!("{} is required", field("stock")));
            0
        }
        Some(s) if s < 0 => {
            errors.push(format!("{} must be greater than or equal to 0", field("stock")));
            s
        }
        Some(s) => s,
    };

    if errors.len() != before {
        return None;
    }

    Some(VariantDraft {
        id,
        name,
        value,
        price,
        stock,
        sku,
    })
}

fn required_text(
    errors: &mut Vec<String>,
    field: &str,
    value: Option<String>,
    min: usize,
    max: usize,
) -> Option<String> {
    let Some(value) = value else {
        errors.push(format!("{field} is required"));
        return None;
    };
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        errors.push(format!("{field} is required"));
        return None;
    }
    if len < min || len > max {
        errors.push(format!("{field} must be between {min} and {max} characters"));
        return None;
    }
    Some(trimmed.to_string())
}

/// http(s) URL whose path ends in a supported image extension.
fn is_valid_image_url(raw: &str) -> bool {
    let Ok(url) = url::Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return false;
    }
    let path = url.path().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.len() > ext.len() + 1 && path.ends_with(ext))
}
