use anyhow::Context;
use catalog_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let config = AppConfig::from_env()?;
    let app = catalog_api::app::build_app(&config)
        .await
        .context("failed to initialise catalog store")?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
