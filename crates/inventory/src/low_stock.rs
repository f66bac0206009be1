//! Low-stock scan: variants (or variantless products) at or below a threshold.

use serde::Serialize;

use catalog_core::{ProductId, VariantId};
use catalog_products::ResolvedProduct;

/// Label used for the implicit line of a product without variants.
pub const DEFAULT_VARIANT_LABEL: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub product_name: String,
    /// Resolved category name; `None` when the category no longer exists.
    pub category: Option<String>,
    pub variant_id: Option<VariantId>,
    pub variant_name: String,
    pub current_stock: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockReport {
    pub threshold: i64,
    pub total_low_stock_items: usize,
    pub items: Vec<LowStockItem>,
}

/// Scan active products for stock at or below `threshold`.
///
/// A product without variants always yields one `"Default"` line with stock 0.
/// Output follows input order (products, then variants); nothing is re-sorted.
pub fn low_stock_report(products: &[ResolvedProduct], threshold: i64) -> LowStockReport {
    let mut items = Vec::new();

    for resolved in products.iter().filter(|r| r.product.is_active) {
        let product = &resolved.product;
        let category = resolved.category.as_ref().map(|c| c.name.clone());

        if product.variants.is_empty() {
            items.push(LowStockItem {
                product_id: product.id,
                product_name: product.name.clone(),
                category,
                variant_id: None,
                variant_name: DEFAULT_VARIANT_LABEL.to_string(),
                current_stock: 0,
                threshold,
            });
            continue;
        }

        for variant in product.variants.iter().filter(|v| v.stock <= threshold) {
            items.push(LowStockItem {
                product_id: product.id,
                product_name: product.name.clone(),
                category: category.clone(),
                variant_id: Some(variant.id),
                variant_name: variant.label(),
                current_stock: variant.stock,
                threshold,
            });
        }
    }

    LowStockReport {
        threshold,
        total_low_stock_items: items.len(),
        items,
    }
}
