use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;

use catalog_core::{CategoryId, DomainError, ProductId, VariantId};
use catalog_products::{CategoryRef, Product, ProductInput, ResolvedProduct};

use crate::app::dto;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/inventory", patch(update_inventory))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListProductsParams>,
) -> ApiResult<Response> {
    let query = params.into_query()?;
    let page = services.products.list_products(&query).await?;
    Ok(dto::product_page(page))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let resolved = load_product(&services, parse_id(&id)?).await?;
    Ok(dto::ok(dto::product_to_json(&resolved)))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let draft = input.validate()?;
    let category = existing_category(&services, draft.category).await?;

    let product = Product::create(ProductId::new(), draft, Utc::now());
    services.products.insert_product(product.clone()).await?;
    tracing::info!(product_id = %product.id, "product created");

    Ok(dto::created(dto::product_to_json(&ResolvedProduct::new(
        product,
        Some(category),
    ))))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Response> {
    let id: ProductId = parse_id(&id)?;
    let Json(input) = body?;
    let draft = input.validate()?;

    let mut product = load_product(&services, id).await?.product;
    let category = existing_category(&services, draft.category).await?;

    product.apply_update(draft, Utc::now());
    services.products.update_product(product.clone()).await?;

    Ok(dto::ok(dto::product_to_json(&ResolvedProduct::new(
        product,
        Some(category),
    ))))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id: ProductId = parse_id(&id)?;
    if !services.products.delete_product(id).await? {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "product deleted");
    Ok(dto::message("Product deleted successfully"))
}

/// Set the absolute stock of one variant. Without `variantId` the product is
/// returned unchanged.
pub async fn update_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateInventoryRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id: ProductId = parse_id(&id)?;
    let Json(body) = body?;

    let stock = body
        .stock
        .ok_or_else(|| ApiError::Validation(vec!["stock is required".to_string()]))?;
    if stock < 0 {
        return Err(ApiError::bad_request("Stock cannot be negative"));
    }

    let mut resolved = load_product(&services, id).await?;

    if let Some(raw) = body.variant_id.filter(|v| !v.trim().is_empty()) {
        let variant_id: VariantId = raw.trim().parse().map_err(|_| variant_not_found())?;
        resolved
            .product
            .set_variant_stock(variant_id, stock, Utc::now())
            .map_err(|e| match e {
                DomainError::NotFound => variant_not_found(),
                other => other.into(),
            })?;
        services.products.update_product(resolved.product.clone()).await?;
        tracing::info!(product_id = %id, variant_id = %variant_id, stock, "variant stock updated");
    }

    Ok(dto::ok(dto::product_to_json(&resolved)))
}

async fn load_product(services: &AppServices, id: ProductId) -> ApiResult<ResolvedProduct> {
    services
        .products
        .get_product(id)
        .await?
        .ok_or_else(product_not_found)
}

/// Products may only reference categories that exist at write time.
async fn existing_category(services: &AppServices, id: CategoryId) -> ApiResult<CategoryRef> {
    services
        .category_ref(id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Category not found"))
}

fn product_not_found() -> ApiError {
    ApiError::not_found("Product not found")
}

fn variant_not_found() -> ApiError {
    ApiError::not_found("Variant not found")
}
