use std::str::FromStr;

use axum::Router;

use crate::app::errors::ApiError;

pub mod categories;
pub mod products;
pub mod reports;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/reports", reports::router())
}

/// Parse a path id; malformed ids are a 400, not a 404.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::invalid_id())
}
