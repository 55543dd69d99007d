//! In-memory venue for exercising the control loop end to end.

use arara_exchange::model::{
    AccountInfo, AssetBalance, CancelAck, ExchangeInfo, OrderAck, SymbolInfo, VenueFilter,
    VenueOrder, VenueTrade,
};
use arara_exchange::{ExchangeApi, ExchangeError, PlaceOrder};
use arara_markets::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct VenueState {
    pub price: Decimal,
    /// (asset, free balance)
    pub balances: Vec<(String, Decimal)>,
    pub open_orders: Vec<VenueOrder>,
    pub trades: Vec<VenueTrade>,
    pub next_order_id: i64,
    pub next_trade_id: i64,
    pub place_count: usize,
    pub cancel_count: usize,
}

/// Deterministic venue: orders rest until a test fills them explicitly.
/// Clones share the same state, so a test keeps a handle while the
/// orchestrator owns another.
#[derive(Debug, Clone)]
pub struct MockExchange {
    pub state: Arc<Mutex<VenueState>>,
}

impl MockExchange {
    pub fn new(price: Decimal, balances: &[(&str, Decimal)]) -> Self {
        Self {
            state: Arc::new(Mutex::new(VenueState {
                price,
                balances: balances
                    .iter()
                    .map(|(asset, free)| (asset.to_string(), *free))
                    .collect(),
                next_order_id: 1,
                next_trade_id: 1,
                ..VenueState::default()
            })),
        }
    }

    pub fn set_balance(&self, asset: &str, free: Decimal) {
        let mut state = self.state.lock().unwrap();
        match state.balances.iter().position(|(name, _)| name == asset) {
            Some(index) => state.balances[index].1 = free,
            None => state.balances.push((asset.to_string(), free)),
        }
    }

    /// Fill a resting order completely: removes it from the book and records
    /// the matching account trade.
    pub fn fill_order(&self, client_order_id: &str, time_ms: i64) {
        let mut state = self.state.lock().unwrap();
        let index = state
            .open_orders
            .iter()
            .position(|order| order.client_order_id == client_order_id)
            .unwrap_or_else(|| panic!("no resting order {client_order_id}"));
        let order = state.open_orders.remove(index);
        let trade_id = state.next_trade_id;
        state.next_trade_id += 1;
        state.trades.push(VenueTrade {
            symbol: order.symbol,
            id: trade_id,
            order_id: order.order_id,
            price: order.price,
            qty: order.orig_qty,
            commission: Decimal::ZERO,
            commission_asset: "USDC".to_string(),
            time_ms,
            is_buyer: order.side == "BUY",
            is_maker: true,
        });
    }

    pub fn open_client_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .open_orders
            .iter()
            .map(|order| order.client_order_id.clone())
            .collect()
    }

    pub fn resting(&self, client_order_id: &str) -> Option<VenueOrder> {
        self.state
            .lock()
            .unwrap()
            .open_orders
            .iter()
            .find(|order| order.client_order_id == client_order_id)
            .cloned()
    }

    pub fn place_count(&self) -> usize {
        self.state.lock().unwrap().place_count
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancel_count
    }
}

impl ExchangeApi for MockExchange {
    async fn account_info(&self) -> Result<AccountInfo, ExchangeError> {
        let state = self.state.lock().unwrap();
        Ok(AccountInfo {
            can_trade: true,
            balances: state
                .balances
                .iter()
                .map(|(asset, free)| AssetBalance {
                    asset: asset.clone(),
                    free: *free,
                    locked: Decimal::ZERO,
                })
                .collect(),
        })
    }

    async fn open_orders(&self, pair: &str) -> Result<Vec<VenueOrder>, ExchangeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .open_orders
            .iter()
            .filter(|order| order.symbol == pair)
            .cloned()
            .collect())
    }

    async fn place_order(&self, request: &PlaceOrder) -> Result<OrderAck, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        state.place_count += 1;
        if state
            .open_orders
            .iter()
            .any(|order| order.client_order_id == request.client_id)
        {
            return Err(ExchangeError::Api {
                code: -2010,
                msg: "Duplicate order sent.".to_string(),
            });
        }
        let order_id = state.next_order_id;
        state.next_order_id += 1;
        state.open_orders.push(VenueOrder {
            symbol: request.pair.clone(),
            order_id,
            client_order_id: request.client_id.clone(),
            price: request.price,
            orig_qty: request.qty,
            executed_qty: Decimal::ZERO,
            status: "NEW".to_string(),
            side: match request.side {
                Side::Buy => "BUY".to_string(),
                Side::Sell => "SELL".to_string(),
            },
            order_type: request.order_type.clone(),
            time_ms: 0,
        });
        Ok(OrderAck {
            symbol: request.pair.clone(),
            order_id,
            client_order_id: request.client_id.clone(),
            transact_time_ms: 0,
            price: Some(request.price),
            orig_qty: Some(request.qty),
            status: Some("NEW".to_string()),
        })
    }

    async fn cancel_order(
        &self,
        pair: &str,
        client_id: &str,
    ) -> Result<CancelAck, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        state.cancel_count += 1;
        let index = state
            .open_orders
            .iter()
            .position(|order| order.symbol == pair && order.client_order_id == client_id);
        match index {
            Some(index) => {
                let order = state.open_orders.remove(index);
                Ok(CancelAck {
                    symbol: order.symbol,
                    order_id: Some(order.order_id),
                    orig_client_order_id: Some(order.client_order_id),
                    status: Some("CANCELED".to_string()),
                })
            }
            None => Err(ExchangeError::Api {
                code: -2013,
                msg: "Order does not exist.".to_string(),
            }),
        }
    }

    async fn current_price(&self, _pair: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.state.lock().unwrap().price)
    }

    async fn my_trades(
        &self,
        pair: &str,
        since_ms: Option<i64>,
    ) -> Result<Vec<VenueTrade>, ExchangeError> {
        let state = self.state.lock().unwrap();
        let since_ms = since_ms.unwrap_or(i64::MIN);
        Ok(state
            .trades
            .iter()
            .filter(|trade| trade.symbol == pair && trade.time_ms >= since_ms)
            .cloned()
            .collect())
    }

    async fn exchange_info(&self, pair: &str) -> Result<ExchangeInfo, ExchangeError> {
        Ok(ExchangeInfo {
            symbols: vec![SymbolInfo {
                symbol: pair.to_string(),
                filters: vec![
                    VenueFilter::Price {
                        tick_size: dec!(0.001),
                    },
                    VenueFilter::LotSize {
                        step_size: dec!(0.01),
                    },
                    VenueFilter::Notional {
                        min_notional: dec!(5.0),
                    },
                ],
            }],
        })
    }
}
