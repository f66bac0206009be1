use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;

use catalog_core::CategoryId;
use catalog_products::{ensure_acyclic, Category, CategoryInput, CategoryRef};

use crate::app::dto;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// Active categories sorted by name, each with its parent resolved.
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Response> {
    let categories = services.categories.list_active_categories().await?;

    let mut refs: HashMap<CategoryId, CategoryRef> =
        categories.iter().map(|c| (c.id, c.to_ref())).collect();
    for parent in categories.iter().filter_map(|c| c.parent) {
        if !refs.contains_key(&parent) {
            if let Some(found) = services.category_ref(parent).await? {
                refs.insert(parent, found);
            }
        }
    }

    let data: Vec<Value> = categories
        .iter()
        .map(|c| dto::category_to_json(c, c.parent.and_then(|p| refs.get(&p))))
        .collect();
    Ok(dto::ok(data))
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let category = load_category(&services, parse_id(&id)?).await?;
    let parent = services.parent_ref(&category).await?;
    Ok(dto::ok(dto::category_to_json(&category, parent.as_ref())))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let draft = input.validate()?;
    let parent = existing_parent(&services, draft.parent).await?;

    let category = Category::create(CategoryId::new(), draft, Utc::now());
    services.categories.insert_category(category.clone()).await?;
    tracing::info!(category_id = %category.id, "category created");

    Ok(dto::created(dto::category_to_json(&category, parent.as_ref())))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<Response> {
    let id: CategoryId = parse_id(&id)?;
    let Json(input) = body?;
    let draft = input.validate()?;

    let mut category = load_category(&services, id).await?;
    let parent = existing_parent(&services, draft.parent).await?;

    let parents = services.categories.category_parents().await?;
    ensure_acyclic(id, draft.parent, |c| parents.get(&c).copied())?;

    category.apply_update(draft, Utc::now());
    services.categories.update_category(category.clone()).await?;

    Ok(dto::ok(dto::category_to_json(&category, parent.as_ref())))
}

/// Categories still referenced by any product cannot be deleted.
pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id: CategoryId = parse_id(&id)?;
    load_category(&services, id).await?;

    if services.products.count_products_in_category(id).await? > 0 {
        return Err(ApiError::bad_request(
            "Cannot delete category with existing products",
        ));
    }

    if !services.categories.delete_category(id).await? {
        return Err(category_not_found());
    }
    tracing::info!(category_id = %id, "category deleted");
    Ok(dto::message("Category deleted successfully"))
}

async fn load_category(services: &AppServices, id: CategoryId) -> ApiResult<Category> {
    services
        .categories
        .get_category(id)
        .await?
        .ok_or_else(category_not_found)
}

async fn existing_parent(
    services: &AppServices,
    parent: Option<CategoryId>,
) -> ApiResult<Option<CategoryRef>> {
    match parent {
        Some(id) => services
            .category_ref(id)
            .await?
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("Parent category not found")),
        None => Ok(None),
    }
}

fn category_not_found() -> ApiError {
    ApiError::not_found("Category not found")
}
