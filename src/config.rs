//! Service configuration (env-var based)

use rust_decimal::Decimal;
use std::str::FromStr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Merchant TON wallet receiving payments
    pub merchant_address: String,
    /// TonAPI v2 base URL
    pub tonapi_base_url: String,
    /// TonAPI bearer key
    pub tonapi_key: String,
    /// Telegram bot token for delivery notices
    pub telegram_bot_token: String,
    /// Operator chat the bot posts delivery notices to
    pub telegram_admin_chat_id: String,
    /// Shared secret for the admin endpoints (x-admin-key header)
    pub admin_key: String,
    /// Base price of one star, in TON
    pub price_per_star: Decimal,
    /// Operator markup, percent
    pub markup_percent: Decimal,
    /// Minimum stars per order
    pub min_stars: i32,
    /// Sanity ceiling on stars per order
    pub max_stars: i32,
    /// SES sender address for admin mails
    pub ses_from_email: String,
    /// Admin mailbox receiving paid-order notices; unset disables email
    pub admin_email: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
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

    fn decimal_var(name: &str, default: &str) -> Result<Decimal, BoxError> {
        let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
        Decimal::from_str(&raw).map_err(|e| format!("{name} is not a decimal: {e}").into())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            merchant_address: std::env::var("TON_MERCHANT_ADDRESS")
                .map_err(|_| "TON_MERCHANT_ADDRESS must be set")?,
            tonapi_base_url: std::env::var("TONAPI_BASE_URL")
                .unwrap_or_else(|_| "https://tonapi.io/v2".into()),
            tonapi_key: Self::require_secret("TONAPI_KEY", &environment)?,
            telegram_bot_token: Self::require_secret("TELEGRAM_BOT_TOKEN", &environment)?,
            telegram_admin_chat_id: std::env::var("TELEGRAM_ADMIN_CHAT_ID")
                .unwrap_or_else(|_| "0".into()),
            admin_key: Self::require_secret("ADMIN_KEY", &environment)?,
            price_per_star: Self::decimal_var("TON_PRICE_PER_STAR", "0.0002")?,
            markup_percent: Self::decimal_var("MARKUP_PERCENT", "3")?,
            min_stars: std::env::var("MIN_STARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            max_stars: std::env::var("MAX_STARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1_000_000),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@example.com".into()),
            admin_email: std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            environment,
        })
    }
}
