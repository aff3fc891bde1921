use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use common_auth::{JwtVerifier, TokenSigner};
use common_observability::StockMetrics;
use sqlx::postgres::PgPoolOptions;
use stock_service::config::load_service_config;
use stock_service::{build_router, AppState, PgStockStore, StockEngine, MIGRATOR};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    if config.run_migrations {
        MIGRATOR.run(&db).await.context("failed to run migrations")?;
        info!("database migrations applied");
    }

    let metrics = Arc::new(StockMetrics::new());
    let store = Arc::new(PgStockStore::new(db.clone()));
    let state = AppState {
        db,
        engine: StockEngine::new(store, metrics.clone()),
        jwt_verifier: Arc::new(JwtVerifier::new(config.jwt.clone())),
        token_signer: Arc::new(TokenSigner::new(config.jwt.clone())),
        metrics,
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = build_router(state).layer(cors);

    let ip: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST is not an IP address: {}", config.host))?;
    let addr = SocketAddr::from((ip, config.port));
    info!(%addr, "starting stock-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
