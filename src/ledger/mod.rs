//! Order ledger domain model and storage trait
//!
//! One `star_orders` row per purchase intent, a singleton `star_bank`
//! inventory row, and a lazily-created `star_accounts` row per buyer.
//! All cross-request consistency lives in the store's conditional updates;
//! nothing in-process is authoritative.

pub mod pg;

#[cfg(test)]
pub mod mem;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

/// Order lifecycle status.
///
/// ```text
///  (none) --create--> pending --confirm--> paid --notifier/admin--> delivered
///                                            \--admin--> refunded
/// ```
/// `delivered` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Delivered => "delivered",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "delivered" => Some(Self::Delivered),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Legal transitions of the lifecycle state machine.
    pub fn may_transition(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Paid)
                | (Self::Paid, Self::Delivered)
                | (Self::Paid, Self::Refunded)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status filter token accepted by the admin list endpoint.
/// `open` is the union {pending, paid}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Exact(OrderStatus),
    Open,
    All,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "all" => Some(Self::All),
            other => OrderStatus::parse(other).map(Self::Exact),
        }
    }
}

/// One purchase intent. Rows are never deleted; only `status`,
/// `ton_tx_hash`, `sender_address` and `updated_at` ever change.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub tg_username: String,
    pub stars: i32,
    pub amount_ton: Decimal,
    pub merchant_address: String,
    pub sender_address: Option<String>,
    pub ton_tx_hash: Option<String>,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload for a new pending order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tg_username: String,
    pub stars: i32,
    pub amount_ton: Decimal,
    pub merchant_address: String,
}

/// Result of a conditional status flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This call won the conditional update.
    Settled,
    /// Another caller got there first (or the source state never held);
    /// carries the status observed after the failed update.
    AlreadyProcessed(OrderStatus),
}

/// Durable order/bank/account storage.
///
/// `settle_payment` and `transition` are the only mutation paths after
/// creation, and both are conditional on the current status so concurrent
/// callers cannot double-apply an effect.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_order(&self, new: NewOrder) -> Result<Order, sqlx::Error>;

    async fn get_order(&self, id: i64) -> Result<Option<Order>, sqlx::Error>;

    /// Atomically: flip `pending -> paid`, record the tx hash (set-if-null),
    /// decrement the bank by the order's star count and credit the buyer's
    /// account, all in one transaction. Exactly-once per order.
    async fn settle_payment(&self, id: i64, tx_hash: &str) -> Result<SettleOutcome, sqlx::Error>;

    /// Conditional `from -> to` status flip with no bookkeeping side effects.
    /// Used for `paid -> delivered` and the admin overrides.
    async fn transition(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<SettleOutcome, sqlx::Error>;

    /// Record the sender wallet address if not already set.
    async fn record_sender(&self, id: i64, address: &str) -> Result<(), sqlx::Error>;

    /// Newest-first page of orders matching the filter.
    async fn list_orders(&self, filter: StatusFilter, limit: i64)
        -> Result<Vec<Order>, sqlx::Error>;

    async fn bank_balance(&self) -> Result<i64, sqlx::Error>;

    async fn account_balance(&self, tg_username: &str) -> Result<i64, sqlx::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_text() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn transition_table_matches_state_machine() {
        use OrderStatus::*;
        assert!(Pending.may_transition(Paid));
        assert!(Paid.may_transition(Delivered));
        assert!(Paid.may_transition(Refunded));

        // everything else is illegal
        assert!(!Pending.may_transition(Delivered));
        assert!(!Pending.may_transition(Refunded));
        assert!(!Delivered.may_transition(Refunded));
        assert!(!Delivered.may_transition(Paid));
        assert!(!Refunded.may_transition(Paid));
        assert!(!Paid.may_transition(Pending));
    }

    #[test]
    fn filter_tokens() {
        assert_eq!(
            StatusFilter::parse("pending"),
            Some(StatusFilter::Exact(OrderStatus::Pending))
        );
        assert_eq!(StatusFilter::parse("open"), Some(StatusFilter::Open));
        assert_eq!(StatusFilter::parse("all"), Some(StatusFilter::All));
        assert_eq!(StatusFilter::parse("bogus"), None);
    }
}
