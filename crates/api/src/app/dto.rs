use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use catalog_core::CategoryId;
use catalog_infra::{Pagination, ProductPage, ProductQuery, SortField, SortOrder};
use catalog_products::{Category, CategoryRef, ResolvedProduct};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /api/products`. Everything arrives as text so that
/// malformed numbers can fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub featured: Option<String>,
    pub is_active: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListProductsParams {
    pub fn into_query(self) -> Result<ProductQuery, ApiError> {
        let category = match non_blank(self.category) {
            Some(raw) => Some(raw.parse::<CategoryId>().map_err(|_| ApiError::invalid_id())?),
            None => None,
        };

        // An explicit sortBy sorts ascending unless told otherwise; the
        // implicit default is newest first.
        let (sort_by, sort_order) = match non_blank(self.sort_by) {
            Some(field) => {
                let field = field.parse::<SortField>().map_err(|_| {
                    ApiError::Validation(vec![
                        "sortBy must be one of name, basePrice, createdAt, updatedAt".to_string(),
                    ])
                })?;
                let order = non_blank(self.sort_order)
                    .and_then(|o| o.parse::<SortOrder>().ok())
                    .unwrap_or(SortOrder::Asc);
                (field, order)
            }
            None => (SortField::CreatedAt, SortOrder::Desc),
        };

        Ok(ProductQuery {
            search: non_blank(self.search),
            category,
            min_price: non_blank(self.min_price).and_then(|v| v.parse::<Decimal>().ok()),
            max_price: non_blank(self.max_price).and_then(|v| v.parse::<Decimal>().ok()),
            featured: non_blank(self.featured).map(|v| v == "true"),
            is_active: non_blank(self.is_active).is_none_or(|v| v == "true"),
            sort_by,
            sort_order,
            pagination: Pagination::new(
                non_blank(self.page).and_then(|v| v.parse().ok()),
                non_blank(self.limit).and_then(|v| v.parse().ok()),
            ),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryRequest {
    pub variant_id: Option<String>,
    pub stock: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// -------------------------
// Response envelopes
// -------------------------

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaginationBody {
    current: u32,
    total: u64,
    count: usize,
    total_items: u64,
}

#[derive(Debug, Serialize)]
struct PaginatedEnvelope<T> {
    success: bool,
    data: T,
    pagination: PaginationBody,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::CREATED, data)
}

fn with_status<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

/// `{ success: true, message }` for operations without a body (deletes).
pub fn message(msg: &str) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "message": msg }))).into_response()
}

pub fn product_page(page: ProductPage) -> Response {
    let pagination = PaginationBody {
        current: page.pagination.page,
        total: page.total_pages(),
        count: page.items.len(),
        total_items: page.total,
    };
    let data: Vec<Value> = page.items.iter().map(product_to_json).collect();
    (
        StatusCode::OK,
        Json(PaginatedEnvelope {
            success: true,
            data,
            pagination,
        }),
    )
        .into_response()
}

// -------------------------
// Domain -> JSON mapping
// -------------------------

pub fn product_to_json(resolved: &ResolvedProduct) -> Value {
    let p = &resolved.product;
    json!({
        "_id": p.id.to_string(),
        "name": p.name,
        "description": p.description,
        "category": resolved.category,
        "basePrice": p.base_price,
        "discountPercentage": p.discount_percentage,
        "finalPrice": p.final_price().round_dp(2),
        "variants": p.variants,
        "totalStock": p.total_stock(),
        "images": p.images,
        "tags": p.tags,
        "isActive": p.is_active,
        "featured": p.featured,
        "createdAt": p.created_at.to_rfc3339(),
        "updatedAt": p.updated_at.to_rfc3339(),
    })
}

/// `parent` is the resolved parent, if the category has one that still exists.
pub fn category_to_json(category: &Category, parent: Option<&CategoryRef>) -> Value {
    json!({
        "_id": category.id.to_string(),
        "name": category.name,
        "description": category.description,
        "parentCategory": parent,
        "isActive": category.is_active,
        "createdAt": category.created_at.to_rfc3339(),
        "updatedAt": category.updated_at.to_rfc3339(),
    })
}
