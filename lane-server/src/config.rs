//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// lane-server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Public site URL, base for payment return/callback URLs
    pub site_url: String,
    /// HS256 secret of the hosted auth provider
    pub auth_jwt_secret: String,
    pub yoco_secret_key: String,
    /// Webhook signing secret; hex key or `whsec_`-prefixed base64
    pub yoco_webhook_secret: Option<String>,
    pub yoco_api_base: String,
    pub payfast_merchant_id: String,
    pub payfast_merchant_key: String,
    pub payfast_passphrase: Option<String>,
    pub payfast_sandbox: bool,
    /// Unpaid drafts older than this are swept
    pub draft_order_ttl_minutes: i64,
}

impl Config {
    /// Require a secret: must be set and non-empty in non-development environments.
    fn require_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match lookup(name) {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let optional = |name: &str| lookup(name).filter(|s| !s.is_empty());

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            http_port: lookup("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            site_url: lookup("SITE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".into()),
            auth_jwt_secret: Self::require_secret(&lookup, "AUTH_JWT_SECRET", &environment)?,
            yoco_secret_key: Self::require_secret(&lookup, "YOCO_SECRET_KEY", &environment)?,
            yoco_webhook_secret: optional("YOCO_WEBHOOK_SECRET"),
            yoco_api_base: lookup("YOCO_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://payments.yoco.com/api".into()),
            payfast_merchant_id: Self::require_secret(&lookup, "PAYFAST_MERCHANT_ID", &environment)?,
            payfast_merchant_key: Self::require_secret(
                &lookup,
                "PAYFAST_MERCHANT_KEY",
                &environment,
            )?,
            payfast_passphrase: optional("PAYFAST_PASSPHRASE"),
            payfast_sandbox: lookup("PAYFAST_SANDBOX")
                .map(|v| !matches!(v.trim(), "false" | "0" | "no"))
                .unwrap_or(true),
            draft_order_ttl_minutes: lookup("DRAFT_ORDER_TTL_MINUTES")
                .and_then(|v| v.parse().ok())
                .filter(|m: &i64| *m > 0)
                .unwrap_or(60),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
