use std::sync::Arc;

use anyhow::Context;
use common_auth::{JwtConfig, JwtVerifier, TokenIssuer};
use common_crypto::{CredentialHasher, HashingConfig};
use sqlx::postgres::PgPoolOptions;
use storefront_service::{
    config::load_service_config,
    cors_layer,
    media::CloudinaryStore,
    metrics::StorefrontMetrics,
    router,
    store::PgStore,
    AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    tracing::info!(media = ?config.media, "configuration loaded");

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to DATABASE_URL")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run migrations")?;

    let store = Arc::new(PgStore::new(db));
    let jwt_config = JwtConfig::new(config.jwt_secret.as_bytes());
    let hasher = CredentialHasher::new(&HashingConfig::new(config.password_hash_cost))
        .context("Failed to build password hasher")?;
    let media = CloudinaryStore::new(reqwest::Client::new(), config.media.clone());

    let state = AppState::new(
        store.clone(),
        store,
        Arc::new(media),
        Arc::new(TokenIssuer::new(&jwt_config)),
        Arc::new(JwtVerifier::new(&jwt_config)),
        Arc::new(hasher),
        Arc::new(StorefrontMetrics::new()?),
    );

    let app = router(state).layer(cors_layer(&config.cors_allowed_origins));

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "starting storefront-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
