use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use catalog_core::{CategoryId, ProductId, VariantId};
use catalog_products::{CategoryRef, Product, ResolvedProduct, Variant};

pub fn category(name: &str) -> CategoryRef {
    CategoryRef {
        id: CategoryId::new(),
        name: name.to_string(),
    }
}

pub fn variant(name: &str, value: &str, stock: i64) -> Variant {
    Variant {
        id: VariantId::new(),
        name: name.to_string(),
        value: value.to_string(),
        price: Decimal::from(10),
        stock,
        sku: format!("SKU-{}", VariantId::new()),
    }
}

pub fn product(name: &str, category: Option<&CategoryRef>, base_price: i64, stocks: &[i64]) -> ResolvedProduct {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let product = Product {
        id: ProductId::new(),
        name: name.to_string(),
        description: format!("{name} description"),
        category: category.map(|c| c.id).unwrap_or_default(),
        base_price: Decimal::from(base_price),
        discount_percentage: Decimal::ZERO,
        variants: stocks
            .iter()
            .enumerate()
            .map(|(i, s)| variant("Size", &format!("S{i}"), *s))
            .collect(),
        images: Vec::new(),
        tags: Vec::new(),
        is_active: true,
        featured: false,
        created_at: at,
        updated_at: at,
    };
    ResolvedProduct::new(product, category.cloned())
}

pub fn inactive(mut p: ResolvedProduct) -> ResolvedProduct {
    p.product.is_active = false;
    p
}
