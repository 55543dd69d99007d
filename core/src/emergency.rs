//! Out-of-band emergency close.
//!
//! Cancels every venue order in the basket's namespace and, when a position
//! remains, places a single safety-margin exit sell. All store writes happen
//! inside one transaction: a write failure rolls everything back and reports
//! `success: false`. The basket stays active; trading resumes on the next
//! cycle unless the gate is stopped.

use crate::error::CoreError;
use arara_exchange::{ExchangeApi, FilterCache, PlaceOrder};
use arara_markets::{BasketId, ClientOrderId, Side};
use arara_store::{net_position, NewOrder, OrderStatus, Store};
use arara_strategy::numeric::round_down;
use arara_strategy::plan::DUST_QTY;
use arara_strategy::StrategyError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

/// Default distance below the market for the exit limit.
pub const DEFAULT_SAFETY_MARGIN: Decimal = dec!(0.03);

/// Structured result handed back to whatever triggered the close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyCloseOutcome {
    pub success: bool,
    pub message: String,
    pub canceled_count: usize,
    pub exit_order_placed: bool,
}

impl EmergencyCloseOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            canceled_count: 0,
            exit_order_placed: false,
        }
    }
}

/// Cancels everything and walks the position out at a safety margin.
#[derive(Debug)]
pub struct EmergencyCloser<'a, C> {
    client: &'a C,
    store: &'a Store,
    filters: &'a FilterCache,
}

impl<'a, C> EmergencyCloser<'a, C>
where
    C: ExchangeApi,
{
    pub fn new(client: &'a C, store: &'a Store, filters: &'a FilterCache) -> Self {
        Self {
            client,
            store,
            filters,
        }
    }

    pub async fn close(&self, basket_id: &BasketId, safety_margin: Decimal) -> EmergencyCloseOutcome {
        match self.close_inner(basket_id, safety_margin).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(basket = %basket_id, %error, "emergency close failed");
                EmergencyCloseOutcome::failed(format!("emergency close failed: {error}"))
            }
        }
    }

    async fn close_inner(
        &self,
        basket_id: &BasketId,
        safety_margin: Decimal,
    ) -> Result<EmergencyCloseOutcome, CoreError> {
        let Some(basket) = self.store.basket(basket_id).await? else {
            return Ok(EmergencyCloseOutcome::failed(format!(
                "unknown basket {basket_id}"
            )));
        };
        let filters = self.filters.get(self.client, &basket.pair).await?;

        let mut tx = self.store.begin().await?;

        let open_orders = self.client.open_orders(&basket.pair).await?;
        let mut canceled_count = 0usize;
        for order in open_orders
            .iter()
            .filter(|order| ClientOrderId::belongs_to(&order.client_order_id, basket_id))
        {
            match self
                .client
                .cancel_order(&basket.pair, &order.client_order_id)
                .await
            {
                Ok(_) => {}
                Err(error) if error.is_unknown_order() => {}
                Err(error) => return Err(error.into()),
            }
            tx.mark_order_canceled(&order.client_order_id).await?;
            canceled_count += 1;
        }

        let position = net_position(&tx.fills_for_basket(basket_id).await?);
        let mut exit_order_placed = false;
        if position > DUST_QTY {
            let price = self.client.current_price(&basket.pair).await?;
            let exit_price = round_down(
                price * (Decimal::ONE - safety_margin),
                filters.tick_size,
            );
            let exit_qty = round_down(position, filters.lot_size);
            if exit_qty > Decimal::ZERO {
                let client_id = ClientOrderId::emergency(&basket.pair, basket_id)
                    .map_err(StrategyError::from)?;
                let request = PlaceOrder::limit(
                    basket.pair.as_str(),
                    Side::Sell,
                    exit_price,
                    exit_qty,
                    client_id.as_str(),
                );
                let venue_order_id = match self.client.place_order(&request).await {
                    Ok(ack) => Some(ack.order_id),
                    Err(error) if error.is_duplicate_order() => None,
                    Err(error) => return Err(error.into()),
                };
                tx.upsert_order(&NewOrder {
                    basket_id: basket_id.clone(),
                    venue_order_id,
                    client_order_id: client_id.to_string(),
                    side: Side::Sell,
                    order_type: "LIMIT".to_string(),
                    price: exit_price,
                    qty: exit_qty,
                    status: OrderStatus::New,
                })
                .await?;
                exit_order_placed = true;
                info!(
                    basket = %basket_id,
                    %exit_price,
                    %exit_qty,
                    "placed emergency exit order"
                );
            }
        }

        tx.commit().await?;
        Ok(EmergencyCloseOutcome {
            success: true,
            message: format!(
                "canceled {canceled_count} orders{}",
                if exit_order_placed {
                    ", placed safety exit"
                } else {
                    ""
                }
            ),
            canceled_count,
            exit_order_placed,
        })
    }
}
