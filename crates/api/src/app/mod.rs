//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring (in-memory or Postgres)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request params, response envelopes, JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use catalog_infra::{AppConfig, StoreResult};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router for `config` (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> StoreResult<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(router(services))
}

/// Router over already-built services.
pub fn router(services: AppServices) -> Router {
    Router::new()
        .route("/", get(routes::system::banner))
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .fallback(routes::system::not_found)
        .layer(Extension(Arc::new(services)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
