//! Best-effort delivery notifier (Telegram Bot API)
//!
//! A notifier failure never rolls back a ledger transition: the order stays
//! `paid` and an operator (or a later retry) completes delivery.

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("notifier failure: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `stars` stars to `handle` (or hand the job to an operator).
    async fn deliver(&self, handle: &str, stars: i32) -> Result<(), NotifyError>;
}

/// Telegram Bot API notifier.
///
/// Posts a delivery instruction to the operator chat. Telegram has no public
/// bot method for gifting Stars today, so actual fulfilment is done from the
/// operator account; this message is the trigger.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, handle: &str, stars: i32) -> Result<(), NotifyError> {
        let text = format!("Deliver {stars} stars to @{handle}");
        let resp = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError(format!("Telegram HTTP {}", resp.status())));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        if body["ok"].as_bool() != Some(true) {
            return Err(NotifyError(format!("Telegram error: {body}")));
        }

        tracing::info!(handle = handle, stars = stars, "Delivery notice sent");
        Ok(())
    }
}
