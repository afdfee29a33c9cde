//! Order lifecycle engine
//!
//! Owns order creation, payment verification against the chain oracle and
//! the atomic status transitions with their bank/account bookkeeping. The
//! engine never trusts the caller's "it's paid" claim: everything is
//! re-derived from the oracle, and the conditional updates in the ledger
//! store make every effect at-most-once no matter how often a client
//! retries a confirmation.


use std::sync::Arc;

use crate::ledger::{LedgerStore, NewOrder, Order, OrderStatus, SettleOutcome, StatusFilter};
use crate::notifier::Notifier;
use crate::pricing::{PriceBook, TOLERANCE_NANO, ton_to_nano};
use crate::ton::{ChainOracle, OracleError, TxInfo};
use crate::util::{normalize_address, normalize_handle};

/// Admin list page size (newest first).
pub const LIST_LIMIT: i64 = 200;

/// Which verification predicate failed. Logged, surfaced only as a
/// single PAYMENT_MISMATCH code to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    Recipient,
    Amount,
    Memo,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Recipient => "recipient",
            Self::Amount => "amount",
            Self::Memo => "memo",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid handle")]
    InvalidHandle,
    #[error("invalid star quantity")]
    InvalidQuantity,
    #[error("order not found")]
    OrderNotFound,
    #[error("payment mismatch: {0}")]
    PaymentMismatch(MismatchReason),
    #[error("oracle unavailable")]
    OracleUnavailable,
    #[error("invalid transition from {from}")]
    InvalidTransition { from: OrderStatus },
    #[error("store error: {0}")]
    Store(sqlx::Error),
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::OrderNotFound,
            other => Self::Store(other),
        }
    }
}

/// Quantity sanity bounds for a single order.
#[derive(Debug, Clone, Copy)]
pub struct StarLimits {
    pub min: i32,
    pub max: i32,
}

impl Default for StarLimits {
    fn default() -> Self {
        Self {
            min: 1,
            max: 1_000_000,
        }
    }
}

/// Outcome of a confirmation call. `settled` is true only for the one call
/// that actually flipped the order to paid; idempotent retries and
/// concurrent losers observe `settled == false`.
#[derive(Debug, Clone, Copy)]
pub struct Confirmation {
    pub status: OrderStatus,
    pub settled: bool,
}

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn ChainOracle>,
    notifier: Arc<dyn Notifier>,
    merchant_address: String,
    price_book: PriceBook,
    limits: StarLimits,
}

impl Engine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<dyn ChainOracle>,
        notifier: Arc<dyn Notifier>,
        merchant_address: String,
        price_book: PriceBook,
        limits: StarLimits,
    ) -> Self {
        Self {
            store,
            oracle,
            notifier,
            merchant_address,
            price_book,
            limits,
        }
    }

    /// Memo the buyer must attach to the transfer so the payment can be
    /// bound to this order.
    pub fn memo_for(order: &Order) -> String {
        format!(
            "order:{};user:@{};stars:{}",
            order.id, order.tg_username, order.stars
        )
    }

    /// Create a pending order. No balance is touched here; the bank and the
    /// buyer's account move only when the payment is confirmed.
    pub async fn create_order(&self, handle: &str, stars: i32) -> Result<Order, EngineError> {
        let handle = normalize_handle(handle).ok_or(EngineError::InvalidHandle)?;
        if stars < self.limits.min || stars > self.limits.max {
            return Err(EngineError::InvalidQuantity);
        }

        let amount_ton = self.price_book.quote(stars);
        let order = self
            .store
            .insert_order(NewOrder {
                tg_username: handle,
                stars,
                amount_ton,
                merchant_address: self.merchant_address.clone(),
            })
            .await?;

        tracing::info!(
            order_id = order.id,
            handle = %order.tg_username,
            stars = order.stars,
            amount_ton = %order.amount_ton,
            "Order created"
        );
        Ok(order)
    }

    /// Verify a claimed payment and settle the order. Safe to call any
    /// number of times, concurrently: the first caller whose transaction
    /// passes verification settles; everyone else gets the current status.
    pub async fn confirm_payment(
        &self,
        order_id: i64,
        tx_hash: &str,
        sender_address: Option<&str>,
    ) -> Result<Confirmation, EngineError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound)?;

        // Primary idempotency guard: anything past pending is final for this
        // call path, no re-verification, no re-mutation.
        if order.status != OrderStatus::Pending {
            return Ok(Confirmation {
                status: order.status,
                settled: false,
            });
        }

        if let Some(sender) = sender_address {
            self.store.record_sender(order_id, sender).await?;
        }

        let tx = match self.oracle.get_transaction(tx_hash).await {
            Ok(tx) => tx,
            Err(OracleError::NotIndexed) => {
                // Not proof of invalidity: the indexer may simply lag the
                // chain. The client is expected to retry.
                tracing::info!(order_id, tx_hash, "Transaction not indexed yet");
                return Err(EngineError::OracleUnavailable);
            }
            Err(OracleError::Unavailable(reason)) => {
                tracing::warn!(order_id, tx_hash, reason = %reason, "Chain oracle unavailable");
                return Err(EngineError::OracleUnavailable);
            }
        };

        verify_payment(&order, &tx).map_err(|reason| {
            tracing::info!(
                order_id,
                tx_hash,
                %reason,
                destination = %tx.destination,
                amount_nano = tx.amount_nano,
                "Payment rejected"
            );
            EngineError::PaymentMismatch(reason)
        })?;

        match self.store.settle_payment(order_id, tx_hash).await? {
            SettleOutcome::AlreadyProcessed(status) => {
                // A concurrent confirmation won the conditional update.
                tracing::info!(order_id, status = status.as_str(), "Already settled");
                Ok(Confirmation {
                    status,
                    settled: false,
                })
            }
            SettleOutcome::Settled => {
                tracing::info!(
                    order_id,
                    tx_hash,
                    stars = order.stars,
                    "Order settled: pending -> paid"
                );
                Ok(Confirmation {
                    status: self.try_deliver(&order).await,
                    settled: true,
                })
            }
        }
    }

    /// Post-commit best-effort delivery. Failures leave the order `paid`
    /// for an admin or a retry job to complete later.
    async fn try_deliver(&self, order: &Order) -> OrderStatus {
        if let Err(e) = self.notifier.deliver(&order.tg_username, order.stars).await {
            tracing::warn!(
                order_id = order.id,
                error = %e,
                "Delivery notification failed; order stays paid"
            );
            return OrderStatus::Paid;
        }

        match self
            .store
            .transition(order.id, OrderStatus::Paid, OrderStatus::Delivered)
            .await
        {
            Ok(SettleOutcome::Settled) => OrderStatus::Delivered,
            Ok(SettleOutcome::AlreadyProcessed(status)) => status,
            Err(e) => {
                tracing::error!(order_id = order.id, error = %e, "Failed to mark delivered");
                OrderStatus::Paid
            }
        }
    }

    /// Admin override: `paid -> delivered` only.
    pub async fn mark_delivered(&self, order_id: i64) -> Result<OrderStatus, EngineError> {
        self.admin_transition(order_id, OrderStatus::Delivered).await
    }

    /// Admin override: `paid -> refunded` only. Does not restore the bank
    /// balance or reverse the account credit; the on-chain refund and any
    /// inventory correction are manual, external acts.
    pub async fn mark_refunded(&self, order_id: i64) -> Result<OrderStatus, EngineError> {
        self.admin_transition(order_id, OrderStatus::Refunded).await
    }

    async fn admin_transition(
        &self,
        order_id: i64,
        to: OrderStatus,
    ) -> Result<OrderStatus, EngineError> {
        debug_assert!(OrderStatus::Paid.may_transition(to));
        match self
            .store
            .transition(order_id, OrderStatus::Paid, to)
            .await?
        {
            SettleOutcome::Settled => {
                tracing::info!(order_id, to = to.as_str(), "Admin transition applied");
                Ok(to)
            }
            SettleOutcome::AlreadyProcessed(from) => {
                Err(EngineError::InvalidTransition { from })
            }
        }
    }

    pub async fn list_orders(&self, filter: StatusFilter) -> Result<Vec<Order>, EngineError> {
        Ok(self.store.list_orders(filter, LIST_LIMIT).await?)
    }

    pub async fn get_order(&self, order_id: i64) -> Result<Order, EngineError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound)
    }

    pub async fn bank_balance(&self) -> Result<i64, EngineError> {
        Ok(self.store.bank_balance().await?)
    }
}

/// The three verification predicates of a payment claim. All must hold.
pub fn verify_payment(order: &Order, tx: &TxInfo) -> Result<(), MismatchReason> {
    if tx.destination != normalize_address(&order.merchant_address) {
        return Err(MismatchReason::Recipient);
    }

    let quoted_nano = ton_to_nano(order.amount_ton);
    if tx.amount_nano < quoted_nano - TOLERANCE_NANO {
        return Err(MismatchReason::Amount);
    }

    if !memo_matches(&tx.comment, order.id) {
        return Err(MismatchReason::Memo);
    }
    Ok(())
}

/// True when `comment` carries the tag `order:<id>` with `<id>` as a whole
/// number, so a payment for order 70 can never settle order 7.
fn memo_matches(comment: &str, order_id: i64) -> bool {
    let tag = format!("order:{order_id}");
    let mut rest = comment;
    while let Some(pos) = rest.find(&tag) {
        let after = &rest[pos + tag.len()..];
        if !after.starts_with(|c: char| c.is_ascii_digit()) {
            return true;
        }
        rest = &rest[pos + tag.len()..];
    }
    false
}

#[cfg(test)]
mod memo_tests {
    use super::memo_matches;

    #[test]
    fn matches_exact_and_delimited_tags() {
        assert!(memo_matches("order:7", 7));
        assert!(memo_matches("order:7;user:@alice_1;stars:100", 7));
        assert!(memo_matches("paying order:123 thanks", 123));
    }

    #[test]
    fn rejects_prefix_collisions() {
        assert!(!memo_matches("order:70", 7));
        assert!(!memo_matches("order:70;user:@bob", 7));
        assert!(memo_matches("order:70", 70));
    }

    #[test]
    fn rejects_missing_tag() {
        assert!(!memo_matches("", 7));
        assert!(!memo_matches("user:@alice_1;stars:100", 7));
        assert!(!memo_matches("order:8", 7));
    }
}
