//! PostgreSQL implementation of the ledger store

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{LedgerStore, NewOrder, Order, OrderStatus, SettleOutcome, StatusFilter};
use crate::util::now_millis;

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    tg_username: String,
    stars: i32,
    amount_ton: Decimal,
    merchant_address: String,
    sender_address: Option<String>,
    ton_tx_hash: Option<String>,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = sqlx::Error;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown order status '{}'", row.status).into())
        })?;
        Ok(Order {
            id: row.id,
            tg_username: row.tg_username,
            stars: row.stars,
            amount_ton: row.amount_ton,
            merchant_address: row.merchant_address,
            sender_address: row.sender_address,
            ton_tx_hash: row.ton_tx_hash,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, tg_username, stars, amount_ton, merchant_address, \
     sender_address, ton_tx_hash, status, created_at, updated_at";

/// Read the current status of an order inside or outside a transaction.
async fn current_status<'e, E>(executor: E, id: i64) -> Result<Option<OrderStatus>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT status FROM star_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    match row {
        None => Ok(None),
        Some((s,)) => match OrderStatus::parse(&s) {
            Some(status) => Ok(Some(status)),
            None => Err(sqlx::Error::Decode(
                format!("unknown order status '{s}'").into(),
            )),
        },
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn insert_order(&self, new: NewOrder) -> Result<Order, sqlx::Error> {
        let now = now_millis();
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO star_orders \
                 (tg_username, stars, amount_ton, merchant_address, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5, $5) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&new.tg_username)
        .bind(new.stars)
        .bind(new.amount_ton)
        .bind(&new.merchant_address)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, sqlx::Error> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM star_orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn settle_payment(&self, id: i64, tx_hash: &str) -> Result<SettleOutcome, sqlx::Error> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        // Conditional flip: only one caller can move pending -> paid.
        // RETURNING gives us the star count for the bookkeeping below.
        let won: Option<(i32, String)> = sqlx::query_as(
            "UPDATE star_orders \
             SET status = 'paid', ton_tx_hash = COALESCE(ton_tx_hash, $2), updated_at = $3 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING stars, tg_username",
        )
        .bind(id)
        .bind(tx_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((stars, tg_username)) = won else {
            // Lost to a concurrent confirmation (or the order left pending
            // some other way). Report what the row says now.
            let status = current_status(&mut *tx, id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            tx.commit().await?;
            return Ok(SettleOutcome::AlreadyProcessed(status));
        };

        sqlx::query("UPDATE star_bank SET balance = balance - $1, updated_at = $2 WHERE id = 1")
            .bind(stars as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO star_accounts (tg_username, balance_stars, updated_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (tg_username) DO UPDATE SET \
                balance_stars = star_accounts.balance_stars + EXCLUDED.balance_stars, \
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&tg_username)
        .bind(stars as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SettleOutcome::Settled)
    }

    async fn transition(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<SettleOutcome, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE star_orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let status = current_status(&self.pool, id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(SettleOutcome::AlreadyProcessed(status));
        }
        Ok(SettleOutcome::Settled)
    }

    async fn record_sender(&self, id: i64, address: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE star_orders \
             SET sender_address = COALESCE(sender_address, $2), updated_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(address)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_orders(
        &self,
        filter: StatusFilter,
        limit: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let rows: Vec<OrderRow> = match filter {
            StatusFilter::All => {
                sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM star_orders \
                     ORDER BY created_at DESC, id DESC LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            StatusFilter::Open => {
                sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM star_orders \
                     WHERE status IN ('pending', 'paid') \
                     ORDER BY created_at DESC, id DESC LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            StatusFilter::Exact(status) => {
                sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM star_orders \
                     WHERE status = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2"
                ))
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn bank_balance(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT balance FROM star_bank WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn account_balance(&self, tg_username: &str) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance_stars FROM star_accounts WHERE tg_username = $1")
                .bind(tg_username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }
}
