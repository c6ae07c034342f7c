//! lane-server binary
//!
//! Loads configuration, applies migrations and serves the API alongside the
//! background maintenance tasks.

use std::net::SocketAddr;

use lane_server::services::drafts;
use lane_server::{AppState, Config};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lane_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting lane-server (env: {})", config.environment);
    if config.yoco_webhook_secret.is_none() {
        tracing::warn!("YOCO_WEBHOOK_SECRET not set; Yoco webhooks are rejected outside development");
    }

    let state = AppState::new(&config).await?;
    let app = lane_server::build_app(state.clone());

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let _sweeper = drafts::spawn_sweeper(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("lane-server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
