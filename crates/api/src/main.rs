use std::sync::Arc;

use anyhow::Context;

use harvest_api::app::{self, services::Storefront};
use harvest_infra::StorefrontConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    harvest_observability::init();

    let config = StorefrontConfig::from_env().context("invalid storefront configuration")?;
    let backend = app::services::build_backend(&config).await?;
    let services = Arc::new(Storefront::from_config(backend, &config));

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
