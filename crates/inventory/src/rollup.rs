//! Per-category rollup: product count, average base price and variant count.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use catalog_core::CategoryId;
use catalog_products::ResolvedProduct;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRollupRow {
    #[serde(rename = "_id")]
    pub category_id: CategoryId,
    pub category_name: String,
    pub product_count: u64,
    pub average_price: Decimal,
    pub total_variants: u64,
}

struct Accumulator {
    category_id: CategoryId,
    category_name: String,
    product_count: u64,
    price_sum: Decimal,
    total_variants: u64,
}

/// Group active products by resolved category.
///
/// Products whose category does not resolve are left out. Rows are sorted by
/// product count, descending; equal counts keep first-encounter order.
pub fn category_rollup(products: &[ResolvedProduct]) -> Vec<CategoryRollupRow> {
    let mut index: HashMap<CategoryId, usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();

    for resolved in products.iter().filter(|r| r.product.is_active) {
        let Some(category) = resolved.category.as_ref() else {
            continue;
        };

        let slot = *index.entry(category.id).or_insert_with(|| {
            groups.push(Accumulator {
                category_id: category.id,
                category_name: category.name.clone(),
                product_count: 0,
                price_sum: Decimal::ZERO,
                total_variants: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.product_count += 1;
        group.price_sum += resolved.product.base_price;
        group.total_variants += resolved.product.variants.len() as u64;
    }

    let mut rows: Vec<CategoryRollupRow> = groups
        .into_iter()
        .map(|g| CategoryRollupRow {
            category_id: g.category_id,
            category_name: g.category_name,
            product_count: g.product_count,
            average_price: (g.price_sum / Decimal::from(g.product_count)).normalize(),
            total_variants: g.total_variants,
        })
        .collect();

    // `sort_by` is stable, which keeps first-encounter order for ties.
    rows.sort_by(|a, b| b.product_count.cmp(&a.product_count));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{category, inactive, product};

    #[test]
    fn average_price_is_mean_of_base_prices() {
        let books = category("Books");
        let rows = category_rollup(&[
            product("A", Some(&books), 10, &[1]),
            product("B", Some(&books), 20, &[1, 2]),
        ]);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.category_id, books.id);
        assert_eq!(row.category_name, "Books");
        assert_eq!(row.product_count, 2);
        assert_eq!(row.average_price, Decimal::from(15));
        assert_eq!(row.total_variants, 3);
    }

    #[test]
    fn rows_sorted_by_product_count_with_stable_ties() {
        let a = category("A");
        let b = category("B");
        let c = category("C");
        let rows = category_rollup(&[
            product("a1", Some(&a), 1, &[]),
            product("b1", Some(&b), 1, &[]),
            product("c1", Some(&c), 1, &[]),
            product("c2", Some(&c), 1, &[]),
        ]);

        let names: Vec<_> = rows.iter().map(|r| r.category_name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn unresolved_and_inactive_products_are_excluded() {
        let a = category("A");
        let rows = category_rollup(&[
            product("orphan", None, 5, &[1]),
            inactive(product("old", Some(&a), 5, &[1])),
        ]);
        assert!(rows.is_empty());
    }

    #[test]
    fn serializes_with_mongo_style_id_and_float_average() {
        let a = category("Garden");
        let rows = category_rollup(&[product("Hose", Some(&a), 7, &[])]);
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["_id"], a.id.to_string());
        assert_eq!(json[0]["categoryName"], "Garden");
        assert_eq!(json[0]["productCount"], 1);
        assert_eq!(json[0]["averagePrice"].as_f64(), Some(7.0));
        assert_eq!(json[0]["totalVariants"], 0);
    }
}
