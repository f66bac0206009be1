//! Inventory summary: stock and variant totals with a per-category breakdown.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use catalog_core::CategoryId;
use catalog_products::ResolvedProduct;

/// Breakdown key for products whose category could not be resolved.
pub const UNCATEGORIZED_KEY: &str = "uncategorized";
const UNCATEGORIZED_NAME: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStock {
    pub name: String,
    pub products: u64,
    pub variants: u64,
    pub total_stock: i64,
}

impl CategoryStock {
    fn new(name: String) -> Self {
        Self {
            name,
            products: 0,
            variants: 0,
            total_stock: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_variants: u64,
    pub total_stock: i64,
    /// Keyed by category id (or [`UNCATEGORIZED_KEY`]); names are carried in
    /// each entry so that two categories sharing a name stay distinct.
    pub category_summary: BTreeMap<String, CategoryStock>,
    pub out_of_stock_items: u64,
}

/// Summarize stock across active products.
///
/// Out-of-stock counting: a variantless product counts once; a product with
/// variants counts once per variant whose stock is 0. The two are exclusive.
pub fn inventory_summary(products: &[ResolvedProduct]) -> InventorySummary {
    let mut total_products = 0;
    let mut total_variants = 0;
    let mut total_stock = 0;
    let mut out_of_stock_items = 0;
    let mut buckets: HashMap<Option<CategoryId>, CategoryStock> = HashMap::new();

    for resolved in products.iter().filter(|r| r.product.is_active) {
        let product = &resolved.product;
        let key = resolved.category.as_ref().map(|c| c.id);
        let bucket = buckets.entry(key).or_insert_with(|| {
            CategoryStock::new(
                resolved
                    .category
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNCATEGORIZED_NAME.to_string()),
            )
        });

        total_products += 1;
        bucket.products += 1;

        if product.variants.is_empty() {
            out_of_stock_items += 1;
            continue;
        }

        for variant in &product.variants {
            total_variants += 1;
            total_stock += variant.stock;
            bucket.variants += 1;
            bucket.total_stock += variant.stock;
            if variant.stock == 0 {
                out_of_stock_items += 1;
            }
        }
    }

    let category_summary = buckets
        .into_iter()
        .map(|(id, stock)| {
            let key = id
                .map(|id| id.to_string())
                .unwrap_or_else(|| UNCATEGORIZED_KEY.to_string());
            (key, stock)
        })
        .collect();

    InventorySummary {
        total_products,
        total_variants,
        total_stock,
        category_summary,
        out_of_stock_items,
    }
}
