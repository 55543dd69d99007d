//! Venue wire models (JSON responses).
//!
//! Prices and quantities arrive as decimal strings and are decoded straight
//! into [`Decimal`]; nothing in the wire layer touches floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue error envelope returned on rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiErrorEnvelope {
    pub code: i32,
    pub msg: String,
}

/// Account information (balances by asset).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountInfo {
    #[serde(rename = "canTrade", default)]
    pub can_trade: bool,
    pub balances: Vec<AssetBalance>,
}

impl AccountInfo {
    /// Free balance for `asset`, zero when the asset is absent.
    pub fn free(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .find(|balance| balance.asset == asset)
            .map(|balance| balance.free)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// One venue-observed order (open orders endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VenueOrder {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: i64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    pub price: Decimal,
    #[serde(rename = "origQty")]
    pub orig_qty: Decimal,
    #[serde(rename = "executedQty", default)]
    pub executed_qty: Decimal,
    pub status: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(rename = "time", default)]
    pub time_ms: i64,
}

/// Acknowledgement for a newly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderAck {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: i64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    #[serde(rename = "transactTime", default)]
    pub transact_time_ms: i64,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(rename = "origQty", default)]
    pub orig_qty: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Acknowledgement for a cancelled order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CancelAck {
    pub symbol: String,
    #[serde(rename = "orderId", default)]
    pub order_id: Option<i64>,
    #[serde(rename = "origClientOrderId", default)]
    pub orig_client_order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Last traded price for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: Decimal,
}

/// One account execution (my trades endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VenueTrade {
    pub symbol: String,
    pub id: i64,
    #[serde(rename = "orderId")]
    pub order_id: i64,
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    #[serde(rename = "commissionAsset")]
    pub commission_asset: String,
    #[serde(rename = "time")]
    pub time_ms: i64,
    #[serde(rename = "isBuyer")]
    pub is_buyer: bool,
    #[serde(rename = "isMaker", default)]
    pub is_maker: bool,
}

/// Exchange info, reduced to the filter block per symbol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<VenueFilter>,
}

/// Venue filter objects, tagged by `filterType`. Unknown filter kinds are
/// tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "filterType")]
pub enum VenueFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    #[serde(rename = "NOTIONAL")]
    Notional {
        #[serde(rename = "minNotional")]
        min_notional: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        #[serde(rename = "minNotional")]
        min_notional: Decimal,
    },
    #[serde(other)]
    Other,
}
