//! In-memory ledger store for engine tests
//!
//! Mirrors the conditional-update semantics of the Postgres implementation:
//! every mutation takes the single inner lock, so a settle is atomic and
//! concurrent callers race on the same status check the SQL version does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LedgerStore, NewOrder, Order, OrderStatus, SettleOutcome, StatusFilter};
use crate::util::now_millis;

#[derive(Default)]
struct Inner {
    orders: HashMap<i64, Order>,
    next_id: i64,
    bank: i64,
    accounts: HashMap<String, i64>,
}

#[derive(Clone, Default)]
pub struct MemLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MemLedger {
    pub async fn with_bank(bank_balance: i64) -> Self {
        let ledger = Self::default();
        ledger.inner.lock().await.bank = bank_balance;
        ledger
    }
}

#[async_trait]
impl LedgerStore for MemLedger {
    async fn insert_order(&self, new: NewOrder) -> Result<Order, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let now = now_millis();
        let order = Order {
            id: inner.next_id,
            tg_username: new.tg_username,
            stars: new.stars,
            amount_ton: new.amount_ton,
            merchant_address: new.merchant_address,
            sender_address: None,
            ton_tx_hash: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, sqlx::Error> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn settle_payment(&self, id: i64, tx_hash: &str) -> Result<SettleOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        let (stars, username) = {
            let order = inner.orders.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
            if order.status != OrderStatus::Pending {
                return Ok(SettleOutcome::AlreadyProcessed(order.status));
            }
            order.status = OrderStatus::Paid;
            if order.ton_tx_hash.is_none() {
                order.ton_tx_hash = Some(tx_hash.to_string());
            }
            order.updated_at = now_millis();
            (order.stars as i64, order.tg_username.clone())
        };
        inner.bank -= stars;
        *inner.accounts.entry(username).or_insert(0) += stars;
        Ok(SettleOutcome::Settled)
    }

    async fn transition(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<SettleOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        let order = inner.orders.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        if order.status != from {
            return Ok(SettleOutcome::AlreadyProcessed(order.status));
        }
        order.status = to;
        order.updated_at = now_millis();
        Ok(SettleOutcome::Settled)
    }

    async fn record_sender(&self, id: i64, address: &str) -> Result<(), sqlx::Error> {
        let mut inner = self.inner.lock().await;
        if let Some(order) = inner.orders.get_mut(&id) {
            if order.sender_address.is_none() {
                order.sender_address = Some(address.to_string());
                order.updated_at = now_millis();
            }
        }
        Ok(())
    }

    async fn list_orders(
        &self,
        filter: StatusFilter,
        limit: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| match filter {
                StatusFilter::All => true,
                StatusFilter::Open => {
                    matches!(o.status, OrderStatus::Pending | OrderStatus::Paid)
                }
                StatusFilter::Exact(s) => o.status == s,
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        orders.truncate(limit as usize);
        Ok(orders)
    }

    async fn bank_balance(&self) -> Result<i64, sqlx::Error> {
        Ok(self.inner.lock().await.bank)
    }

    async fn account_balance(&self, tg_username: &str) -> Result<i64, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .await
            .accounts
            .get(tg_username)
            .copied()
            .unwrap_or(0))
    }
}
