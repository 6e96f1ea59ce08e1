//! Bookstore checkout - reference order/payment backend

use std::sync::Arc;

use anyhow::Result;
use bookstore_checkout::backend::{router, Backend};
use bookstore_checkout::config::BackendConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = BackendConfig::from_env();
    let port = config.port;
    let app = router(Arc::new(Backend::new(config)));

    tracing::info!("Bookstore checkout backend listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
