//! Shared application state

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::engine::{Engine, StarLimits};
use crate::ledger::pg::PgLedger;
use crate::notifier::TelegramNotifier;
use crate::pricing::PriceBook;
use crate::ton::TonApiClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
#[allow(dead_code)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Order lifecycle engine (store + oracle + notifier)
    pub engine: Engine,
    /// Pricing parameters, for the public price endpoint
    pub price_book: PriceBook,
    /// Shared secret for admin endpoints
    pub admin_key: String,
    /// Per-IP rate limiter for order creation
    pub rate_limiter: RateLimiter,
    /// SES client; `None` when ADMIN_EMAIL is unset
    pub ses: Option<SesClient>,
    pub ses_from_email: String,
    pub admin_email: Option<String>,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let price_book = PriceBook::new(config.price_per_star, config.markup_percent);

        let oracle = TonApiClient::new(config.tonapi_base_url.clone(), config.tonapi_key.clone())?;
        let notifier = TelegramNotifier::new(
            &config.telegram_bot_token,
            config.telegram_admin_chat_id.clone(),
        )?;

        let engine = Engine::new(
            Arc::new(PgLedger::new(pool.clone())),
            Arc::new(oracle),
            Arc::new(notifier),
            config.merchant_address.clone(),
            price_book.clone(),
            StarLimits {
                min: config.min_stars,
                max: config.max_stars,
            },
        );

        let ses = if config.admin_email.is_some() {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Some(SesClient::new(&aws_config))
        } else {
            tracing::info!("ADMIN_EMAIL not set; paid-order email notices disabled");
            None
        };

        Ok(Self {
            pool,
            engine,
            price_book,
            admin_key: config.admin_key.clone(),
            rate_limiter: RateLimiter::new(),
            ses,
            ses_from_email: config.ses_from_email.clone(),
            admin_email: config.admin_email.clone(),
        })
    }
}
