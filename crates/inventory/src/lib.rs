//! Inventory reporting over the catalog.
//!
//! Every report is a pure, single-pass transformation of a product snapshot
//! (as returned by the product store, with categories already resolved). No
//! report keeps state between invocations or mutates its input.

pub mod low_stock;
pub mod rollup;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;

pub use low_stock::{LowStockItem, LowStockReport, low_stock_report};
pub use rollup::{CategoryRollupRow, category_rollup};
pub use summary::{CategoryStock, InventorySummary, UNCATEGORIZED_KEY, inventory_summary};

/// Threshold applied when the caller gives none (or an unparsable one).
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Parse a caller-supplied threshold, falling back to `default` silently.
///
/// Only the leading integer is read (`"2.5"` is 2, `"15abc"` is 15). Input
/// without leading digits, or out of range, yields `default`.
pub fn parse_threshold(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(leading_integer).unwrap_or(default)
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits == 0 {
        return None;
    }
    let sign_len = trimmed.len() - unsigned.len();
    trimmed[..sign_len + digits].parse().ok()
}
