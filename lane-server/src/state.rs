//! Application state for lane-server

use dashmap::DashMap;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use uuid::Uuid;

use crate::auth::RateLimiter;
use crate::config::Config;
use crate::live::LiveOrderHub;
use crate::payments::{payfast::PayFastSettings, yoco::YocoClient};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// development | staging | production
    pub environment: String,
    /// Public site URL for payment return pages
    pub site_url: String,
    /// HS256 secret of the hosted auth provider
    pub auth_jwt_secret: String,
    /// Yoco checkout API client
    pub yoco: YocoClient,
    /// Yoco webhook signing secret
    pub yoco_webhook_secret: Option<String>,
    /// PayFast merchant settings
    pub payfast: PayFastSettings,
    /// Minutes before an unpaid draft order is swept
    pub draft_order_ttl_minutes: i64,
    /// Rate limiter for throttled routes
    pub rate_limiter: RateLimiter,
    /// Live order fan-out to kitchen and customer sockets
    pub live_orders: LiveOrderHub,
    /// Open live sockets per user
    pub live_connections: Arc<DashMap<Uuid, AtomicUsize>>,
}

impl AppState {
    /// Connect to the database, run migrations and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::with_pool(config, pool))
    }

    /// Build the state around an existing pool (no migrations)
    pub fn with_pool(config: &Config, pool: PgPool) -> Self {
        Self {
            pool,
            environment: config.environment.clone(),
            site_url: config.site_url.clone(),
            auth_jwt_secret: config.auth_jwt_secret.clone(),
            yoco: YocoClient::new(&config.yoco_api_base, &config.yoco_secret_key),
            yoco_webhook_secret: config.yoco_webhook_secret.clone(),
            payfast: PayFastSettings {
                merchant_id: config.payfast_merchant_id.clone(),
                merchant_key: config.payfast_merchant_key.clone(),
                passphrase: config.payfast_passphrase.clone(),
                sandbox: config.payfast_sandbox,
            },
            draft_order_ttl_minutes: config.draft_order_ttl_minutes,
            rate_limiter: RateLimiter::new(),
            live_orders: LiveOrderHub::new(),
            live_connections: Arc::new(DashMap::new()),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
