//! Persisted entities.
//!
//! Decimals are stored as canonical strings; conversions live next to the
//! queries in [`crate::store`]. Status enums round-trip through fixed string
//! forms rather than integers so the database stays inspectable.

use arara_markets::{BasketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::StoreError;

/// One logical grid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basket {
    pub id: BasketId,
    pub pair: String,
    /// Anchor price the grid levels hang from. Updated on reanchor.
    pub anchor_price: Decimal,
    pub status: BasketStatus,
    /// Configuration snapshot taken at creation (JSON).
    pub config_json: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketStatus {
    Active,
    Closed,
    EmergencyClosed,
}

impl BasketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketStatus::Active => "active",
            BasketStatus::Closed => "closed",
            BasketStatus::EmergencyClosed => "emergency_closed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "active" => Ok(BasketStatus::Active),
            "closed" => Ok(BasketStatus::Closed),
            "emergency_closed" => Ok(BasketStatus::EmergencyClosed),
            other => Err(StoreError::corrupt("basket status", other)),
        }
    }
}

/// One intended or observed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: i64,
    pub basket_id: BasketId,
    /// Venue-assigned id, set once the venue acknowledges placement.
    pub venue_order_id: Option<i64>,
    /// Globally unique; the sole reconciliation key.
    pub client_order_id: String,
    pub side: Side,
    /// Venue nomenclature, e.g. "LIMIT".
    pub order_type: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "new" => Ok(OrderStatus::New),
            "partially_filled" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(StoreError::corrupt("order status", other)),
        }
    }

    /// Still occupying a slot on the venue.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

/// Insert/upsert payload for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub basket_id: BasketId,
    pub venue_order_id: Option<i64>,
    pub client_order_id: String,
    pub side: Side,
    pub order_type: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub status: OrderStatus,
}

/// One execution event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRecord {
    pub id: i64,
    pub order_id: i64,
    pub basket_id: BasketId,
    /// Venue trade id; unique, making sync idempotent.
    pub venue_trade_id: i64,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
    pub executed_at: DateTime<Utc>,
}

/// Insert payload for a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFill {
    pub order_id: i64,
    pub basket_id: BasketId,
    pub venue_trade_id: i64,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
    pub executed_at: DateTime<Utc>,
}

/// Periodic balance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub quote_free: Decimal,
    pub base_free: Decimal,
    /// Quote value of quote + base at the snapshot price.
    pub total_value_quote: Decimal,
}
