//! Inventory reports. Each request reads one snapshot of active products and
//! runs a pure report over it.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
    routing::get,
    Router,
};

use catalog_inventory::{category_rollup, inventory_summary, low_stock_report, parse_threshold};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/low-stock", get(low_stock))
        .route("/inventory-summary", get(summary))
        .route("/products-by-category", get(products_by_category))
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::LowStockParams>,
) -> ApiResult<Response> {
    let threshold = parse_threshold(
        params.threshold.as_deref(),
        services.low_stock_default_threshold,
    );
    let snapshot = services.products.find_active_with_category().await?;
    let report = low_stock_report(&snapshot, threshold);
    tracing::debug!(threshold, items = report.total_low_stock_items, "low-stock report");
    Ok(dto::ok(report))
}

pub async fn summary(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let snapshot = services.products.find_active_with_category().await?;
    Ok(dto::ok(inventory_summary(&snapshot)))
}

pub async fn products_by_category(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Response> {
    let snapshot = services.products.find_active_with_category().await?;
    Ok(dto::ok(category_rollup(&snapshot)))
}
