//! Chain oracle: read-only TON transaction lookup via TonAPI v2
//!
//! The oracle is untrusted input. It only reports what a transaction says;
//! the engine decides whether that satisfies an order. "Not indexed yet" and
//! "TonAPI is down" are both retryable and must never be reported as an
//! invalid payment.

use async_trait::async_trait;
use std::time::Duration;

use crate::util::normalize_address;

/// The on-chain facts the engine verifies against an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfo {
    /// Destination address, normalized (lowercase).
    pub destination: String,
    /// Transferred amount in nanoTON.
    pub amount_nano: i64,
    /// Attached comment / memo text, empty when absent.
    pub comment: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The indexer does not know this transaction (yet). Retryable.
    #[error("transaction not indexed")]
    NotIndexed,
    /// Transport failure or unexpected response. Retryable.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ChainOracle: Send + Sync {
    async fn get_transaction(&self, tx_hash: &str) -> Result<TxInfo, OracleError>;
}

/// TonAPI v2 client (`GET /blockchain/transactions/{hash}`).
#[derive(Clone)]
pub struct TonApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TonApiClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl ChainOracle for TonApiClient {
    async fn get_transaction(&self, tx_hash: &str) -> Result<TxInfo, OracleError> {
        let url = format!(
            "{}/blockchain/transactions/{}",
            self.base_url.trim_end_matches('/'),
            urlencode(tx_hash)
        );

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(OracleError::NotIndexed);
        }
        if !resp.status().is_success() {
            return Err(OracleError::Unavailable(format!(
                "TonAPI HTTP {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        parse_transaction(&body)
            .ok_or_else(|| OracleError::Unavailable("unrecognized TonAPI response shape".into()))
    }
}

fn urlencode(s: &str) -> String {
    // Tx hashes are hex or base64url; only '+', '/', '=' need escaping.
    s.replace('%', "%25")
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

/// Extract destination/amount/comment from a TonAPI transaction payload.
///
/// TonAPI has shipped a few shapes for this response over time, so the
/// lookup is tolerant: `in_msg` or `in_message`, destination as object or
/// string, comment in `decoded_body.text`, `msg_data.text` or `message`.
pub fn parse_transaction(body: &serde_json::Value) -> Option<TxInfo> {
    let tx = body.get("transaction").unwrap_or(body);
    let in_msg = tx.get("in_msg").or_else(|| tx.get("in_message"))?;

    let amount_nano = in_msg
        .get("value")
        .or_else(|| tx.get("amount"))
        .and_then(value_as_i64)?;

    let destination = match in_msg.get("destination") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(obj) => obj.get("address").and_then(|a| a.as_str())?.to_string(),
        None => tx
            .get("account")
            .and_then(|a| a.get("address"))
            .and_then(|a| a.as_str())?
            .to_string(),
    };

    let comment = in_msg
        .get("decoded_body")
        .and_then(|d| d.get("text"))
        .and_then(|t| t.as_str())
        .or_else(|| {
            in_msg
                .get("msg_data")
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str())
        })
        .or_else(|| in_msg.get("message").and_then(|m| m.as_str()))
        .unwrap_or("")
        .to_string();

    Some(TxInfo {
        destination: normalize_address(&destination),
        amount_nano,
        comment,
    })
}

fn value_as_i64(v: &serde_json::Value) -> Option<i64> {
    match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_current_tonapi_shape() {
        let body = json!({
            "hash": "abc",
            "in_msg": {
                "value": 20000000,
                "destination": { "address": "0:ABCDEF" },
                "decoded_body": { "text": "order:7;user:@alice_1;stars:100" }
            }
        });
        let tx = parse_transaction(&body).unwrap();
        assert_eq!(tx.destination, "0:abcdef");
        assert_eq!(tx.amount_nano, 20_000_000);
        assert_eq!(tx.comment, "order:7;user:@alice_1;stars:100");
    }

    #[test]
    fn parses_wrapped_and_stringly_shape() {
        let body = json!({
            "transaction": {
                "in_message": {
                    "value": "819000000",
                    "destination": "0:FEED",
                    "message": "order:12"
                }
            }
        });
        let tx = parse_transaction(&body).unwrap();
        assert_eq!(tx.destination, "0:feed");
        assert_eq!(tx.amount_nano, 819_000_000);
        assert_eq!(tx.comment, "order:12");
    }

    #[test]
    fn missing_comment_is_empty_not_none() {
        let body = json!({
            "in_msg": { "value": 1, "destination": { "address": "0:aa" } }
        });
        let tx = parse_transaction(&body).unwrap();
        assert_eq!(tx.comment, "");
    }

    #[test]
    fn rejects_shape_without_in_msg() {
        assert!(parse_transaction(&json!({ "hash": "x" })).is_none());
    }
}
