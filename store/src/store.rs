//! Store operations over SQLite.
//!
//! Single-connection pool: the writers (orchestrator, emergency closer)
//! serialize on it, which is exactly the coordination the emergency path
//! needs on top of its transaction.

use crate::error::StoreError;
use crate::model::{
    BalanceSnapshot, Basket, BasketStatus, FillRecord, NewFill, NewOrder, OrderRecord,
    OrderStatus,
};
use arara_markets::{BasketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS baskets (
    id           TEXT PRIMARY KEY,
    pair         TEXT NOT NULL,
    anchor_price TEXT NOT NULL,
    status       TEXT NOT NULL,
    config_json  TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    closed_at    TEXT
);

CREATE TABLE IF NOT EXISTS orders (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    basket_id       TEXT NOT NULL REFERENCES baskets(id),
    venue_order_id  INTEGER,
    client_order_id TEXT NOT NULL UNIQUE,
    side            TEXT NOT NULL,
    order_type      TEXT NOT NULL,
    price           TEXT NOT NULL,
    qty             TEXT NOT NULL,
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    filled_at       TEXT,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_orders_basket ON orders(basket_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_orders_venue  ON orders(venue_order_id);

CREATE TABLE IF NOT EXISTS fills (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id         INTEGER NOT NULL REFERENCES orders(id),
    basket_id        TEXT NOT NULL REFERENCES baskets(id),
    venue_trade_id   INTEGER NOT NULL UNIQUE,
    side             TEXT NOT NULL,
    price            TEXT NOT NULL,
    qty              TEXT NOT NULL,
    commission       TEXT NOT NULL,
    commission_asset TEXT NOT NULL,
    executed_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_fills_basket ON fills(basket_id);
CREATE INDEX IF NOT EXISTS idx_fills_order  ON fills(order_id);

CREATE TABLE IF NOT EXISTS account_snapshots (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at        TEXT NOT NULL,
    quote_free        TEXT NOT NULL,
    base_free         TEXT NOT NULL,
    total_value_quote TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bot_config (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Handle to the durable trading state.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        // One connection: writers serialize, and in-memory databases keep a
        // single shared state.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        debug!(url, "store ready");
        Ok(Self { pool })
    }

    /// Fresh in-memory store (tests, dry runs).
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    // --- baskets ---------------------------------------------------------

    pub async fn insert_basket(&self, basket: &Basket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO baskets (id, pair, anchor_price, status, config_json, created_at, closed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(basket.id.as_str())
        .bind(&basket.pair)
        .bind(basket.anchor_price.to_string())
        .bind(basket.status.as_str())
        .bind(&basket.config_json)
        .bind(basket.created_at)
        .bind(basket.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn basket(&self, id: &BasketId) -> Result<Option<Basket>, StoreError> {
        let row = sqlx::query("SELECT * FROM baskets WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(basket_from_row).transpose()
    }

    pub async fn active_baskets(&self) -> Result<Vec<Basket>, StoreError> {
        let rows = sqlx::query("SELECT * FROM baskets WHERE status = ? ORDER BY id")
            .bind(BasketStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(basket_from_row).collect()
    }

    pub async fn update_basket_anchor(
        &self,
        id: &BasketId,
        anchor_price: Decimal,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE baskets SET anchor_price = ? WHERE id = ?")
            .bind(anchor_price.to_string())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_basket_status(
        &self,
        id: &BasketId,
        status: BasketStatus,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE baskets SET status = ?, closed_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(closed_at)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- orders ----------------------------------------------------------

    pub async fn upsert_order(&self, order: &NewOrder) -> Result<(), StoreError> {
        upsert_order(&self.pool, order, Utc::now()).await
    }

    pub async fn order_by_client_id(
        &self,
        client_order_id: &str,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE client_order_id = ?")
            .bind(client_order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    /// Resolve a venue order id back to the local order, scoped to `pair`
    /// since venue ids are only unique per symbol.
    pub async fn order_by_venue_id(
        &self,
        pair: &str,
        venue_order_id: i64,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT orders.* FROM orders
             JOIN baskets ON baskets.id = orders.basket_id
             WHERE orders.venue_order_id = ? AND baskets.pair = ?",
        )
        .bind(venue_order_id)
        .bind(pair)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    pub async fn open_orders(&self, basket_id: &BasketId) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE basket_id = ? AND status IN (?, ?) ORDER BY id",
        )
        .bind(basket_id.as_str())
        .bind(OrderStatus::New.as_str())
        .bind(OrderStatus::PartiallyFilled.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    pub async fn mark_order_canceled(&self, client_order_id: &str) -> Result<(), StoreError> {
        mark_order_canceled(&self.pool, client_order_id, Utc::now()).await
    }

    /// Advance an order's fill status. `filled_at` is required when the
    /// status is `Filled`: an order is never persisted as filled without its
    /// fill time.
    pub async fn set_order_fill_status(
        &self,
        client_order_id: &str,
        status: OrderStatus,
        filled_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        debug_assert!(status != OrderStatus::Filled || filled_at.is_some());
        sqlx::query(
            "UPDATE orders SET status = ?, filled_at = COALESCE(?, filled_at), updated_at = ?
             WHERE client_order_id = ?",
        )
        .bind(status.as_str())
        .bind(filled_at)
        .bind(Utc::now())
        .bind(client_order_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- fills -----------------------------------------------------------

    /// Insert a fill; returns `false` when the venue trade id was already
    /// recorded (idempotent sync).
    pub async fn insert_fill(&self, fill: &NewFill) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO fills (order_id, basket_id, venue_trade_id, side, price, qty,
                                commission, commission_asset, executed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(venue_trade_id) DO NOTHING",
        )
        .bind(fill.order_id)
        .bind(fill.basket_id.as_str())
        .bind(fill.venue_trade_id)
        .bind(side_str(fill.side))
        .bind(fill.price.to_string())
        .bind(fill.qty.to_string())
        .bind(fill.commission.to_string())
        .bind(&fill.commission_asset)
        .bind(fill.executed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fills_for_basket(
        &self,
        basket_id: &BasketId,
    ) -> Result<Vec<FillRecord>, StoreError> {
        fills_for_basket(&self.pool, basket_id).await
    }

    pub async fn fills_for_order(&self, order_id: i64) -> Result<Vec<FillRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM fills WHERE order_id = ? ORDER BY id")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(fill_from_row).collect()
    }

    /// Net base position for a basket: Σ buy qty − Σ sell qty over fills.
    pub async fn position(&self, basket_id: &BasketId) -> Result<Decimal, StoreError> {
        Ok(net_position(&self.fills_for_basket(basket_id).await?))
    }

    // --- snapshots -------------------------------------------------------

    pub async fn insert_snapshot(
        &self,
        quote_free: Decimal,
        base_free: Decimal,
        total_value_quote: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO account_snapshots (created_at, quote_free, base_free, total_value_quote)
             VALUES (?, ?, ?, ?)",
        )
        .bind(at)
        .bind(quote_free.to_string())
        .bind(base_free.to_string())
        .bind(total_value_quote.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn latest_snapshot(&self) -> Result<Option<BalanceSnapshot>, StoreError> {
        let row = sqlx::query("SELECT * FROM account_snapshots ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(BalanceSnapshot {
                id: row.try_get("id")?,
                created_at: row.try_get("created_at")?,
                quote_free: decimal_column(&row, "quote_free")?,
                base_free: decimal_column(&row, "base_free")?,
                total_value_quote: decimal_column(&row, "total_value_quote")?,
            })
        })
        .transpose()
    }

    // --- config overlay --------------------------------------------------

    pub async fn config_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM bot_config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bot_config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- transactions ----------------------------------------------------

    /// Begin a transaction for the emergency-close write set. Dropping the
    /// returned handle without committing rolls back.
    pub async fn begin(&self) -> Result<StoreTx, StoreError> {
        Ok(StoreTx {
            tx: self.pool.begin().await?,
        })
    }
}

/// Transactional view of the store (emergency close path).
#[derive(Debug)]
pub struct StoreTx {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl StoreTx {
    pub async fn upsert_order(&mut self, order: &NewOrder) -> Result<(), StoreError> {
        upsert_order(&mut *self.tx, order, Utc::now()).await
    }

    pub async fn mark_order_canceled(&mut self, client_order_id: &str) -> Result<(), StoreError> {
        mark_order_canceled(&mut *self.tx, client_order_id, Utc::now()).await
    }

    pub async fn fills_for_basket(
        &mut self,
        basket_id: &BasketId,
    ) -> Result<Vec<FillRecord>, StoreError> {
        fills_for_basket(&mut *self.tx, basket_id).await
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit().await?)
    }
}

/// Σ buy qty − Σ sell qty.
pub fn net_position(fills: &[FillRecord]) -> Decimal {
    fills.iter().fold(Decimal::ZERO, |acc, fill| match fill.side {
        Side::Buy => acc + fill.qty,
        Side::Sell => acc - fill.qty,
    })
}

// --- shared query bodies (pool or transaction) ---------------------------

async fn upsert_order<'e, E>(
    executor: E,
    order: &NewOrder,
    now: DateTime<Utc>,
) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO orders (basket_id, venue_order_id, client_order_id, side, order_type,
                             price, qty, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(client_order_id) DO UPDATE SET
             venue_order_id = COALESCE(excluded.venue_order_id, orders.venue_order_id),
             price = excluded.price,
             qty = excluded.qty,
             status = excluded.status,
             updated_at = excluded.updated_at",
    )
    .bind(order.basket_id.as_str())
    .bind(order.venue_order_id)
    .bind(&order.client_order_id)
    .bind(side_str(order.side))
    .bind(&order.order_type)
    .bind(order.price.to_string())
    .bind(order.qty.to_string())
    .bind(order.status.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

async fn mark_order_canceled<'e, E>(
    executor: E,
    client_order_id: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE client_order_id = ?")
        .bind(OrderStatus::Canceled.as_str())
        .bind(now)
        .bind(client_order_id)
        .execute(executor)
        .await?;
    Ok(())
}

async fn fills_for_basket<'e, E>(
    executor: E,
    basket_id: &BasketId,
) -> Result<Vec<FillRecord>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT * FROM fills WHERE basket_id = ? ORDER BY id")
        .bind(basket_id.as_str())
        .fetch_all(executor)
        .await?;
    rows.iter().map(fill_from_row).collect()
}

// --- row mapping ---------------------------------------------------------

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn parse_side(raw: &str) -> Result<Side, StoreError> {
    match raw {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(StoreError::corrupt("order side", other)),
    }
}

fn decimal_column(row: &SqliteRow, column: &'static str) -> Result<Decimal, StoreError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|_| StoreError::corrupt(column, raw))
}

fn basket_id_column(row: &SqliteRow, column: &'static str) -> Result<BasketId, StoreError> {
    let raw: String = row.try_get(column)?;
    BasketId::new(&raw).map_err(|_| StoreError::corrupt(column, raw))
}

fn basket_from_row(row: &SqliteRow) -> Result<Basket, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Basket {
        id: basket_id_column(row, "id")?,
        pair: row.try_get("pair")?,
        anchor_price: decimal_column(row, "anchor_price")?,
        status: BasketStatus::parse(&status)?,
        config_json: row.try_get("config_json")?,
        created_at: row.try_get("created_at")?,
        closed_at: row.try_get("closed_at")?,
    })
}

fn order_from_row(row: &SqliteRow) -> Result<OrderRecord, StoreError> {
    let side: String = row.try_get("side")?;
    let status: String = row.try_get("status")?;
    Ok(OrderRecord {
        id: row.try_get("id")?,
        basket_id: basket_id_column(row, "basket_id")?,
        venue_order_id: row.try_get("venue_order_id")?,
        client_order_id: row.try_get("client_order_id")?,
        side: parse_side(&side)?,
        order_type: row.try_get("order_type")?,
        price: decimal_column(row, "price")?,
        qty: decimal_column(row, "qty")?,
        status: OrderStatus::parse(&status)?,
        created_at: row.try_get("created_at")?,
        filled_at: row.try_get("filled_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn fill_from_row(row: &SqliteRow) -> Result<FillRecord, StoreError> {
    let side: String = row.try_get("side")?;
    Ok(FillRecord {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        basket_id: basket_id_column(row, "basket_id")?,
        venue_trade_id: row.try_get("venue_trade_id")?,
        side: parse_side(&side)?,
        price: decimal_column(row, "price")?,
        qty: decimal_column(row, "qty")?,
        commission: decimal_column(row, "commission")?,
        commission_asset: row.try_get("commission_asset")?,
        executed_at: row.try_get("executed_at")?,
    })
}
