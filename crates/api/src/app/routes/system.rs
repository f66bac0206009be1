use axum::http::StatusCode;
use axum::response::Response;

use crate::app::errors;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn banner() -> &'static str {
    "Exploring the Product Catalog API!"
}

pub async fn not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "Requested resource could not be found.")
}
