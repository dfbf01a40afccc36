mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use evosaas_api::{AppStateInner, routes, token::TokenService};
use evosaas_store::Store;

use crate::config::{Config, DEFAULT_JWT_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evosaas=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("EVO_JWT_SECRET is unset; using the insecure development default");
    }

    let state = Arc::new(AppStateInner {
        store: Store::new(),
        tokens: TokenService::new(&config.jwt_secret),
        environment: config.environment.clone(),
        started_at: Instant::now(),
    });

    let app = routes::router(state, &config.cors_origin);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("evosaas server listening on {}", addr);
    info!(
        "evolution gateway base url: {} (webhook intake only; no outbound calls)",
        config.gateway_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, exiting");
}
