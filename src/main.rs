//! star-cloud — Telegram Stars storefront back-end
//!
//! Long-running service that:
//! - Creates star orders priced in TON
//! - Verifies claimed payments against the TON chain (TonAPI)
//! - Settles orders atomically with bank/account bookkeeping
//! - Exposes an admin surface for listing and override transitions

mod api;
mod auth;
mod config;
mod email;
mod engine;
mod error;
mod ledger;
mod notifier;
mod pricing;
mod state;
mod ton;
mod util;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "star_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting star-cloud (env: {})", config.environment);

    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("star-cloud HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
