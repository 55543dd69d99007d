//! Trade sync: venue executions → local fills.
//!
//! Fills attribute to their parent order through the venue order id recorded
//! at placement; trades that match nothing (manual trading, other software)
//! are skipped. The unique venue trade id makes re-syncing the same window
//! idempotent, and order fill status advances as recorded quantity
//! accumulates.

use crate::error::CoreError;
use arara_exchange::ExchangeApi;
use arara_markets::BasketId;
use arara_store::{NewFill, OrderStatus, Store};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Pull executions for `pair` since `since_ms` and upsert fills for orders
/// belonging to `basket`. Returns the number of new fills recorded.
pub async fn sync_fills<C>(
    client: &C,
    store: &Store,
    basket: &BasketId,
    pair: &str,
    lot_size: Decimal,
    since_ms: i64,
) -> Result<usize, CoreError>
where
    C: ExchangeApi,
{
    let trades = client.my_trades(pair, Some(since_ms)).await?;
    let mut recorded = 0usize;

    for trade in trades {
        let Some(order) = store.order_by_venue_id(pair, trade.order_id).await? else {
            continue;
        };
        if &order.basket_id != basket {
            continue;
        }

        let executed_at = millis_to_datetime(trade.time_ms);
        let inserted = store
            .insert_fill(&NewFill {
                order_id: order.id,
                basket_id: order.basket_id.clone(),
                venue_trade_id: trade.id,
                side: order.side,
                price: trade.price,
                qty: trade.qty,
                commission: trade.commission,
                commission_asset: trade.commission_asset.clone(),
                executed_at,
            })
            .await?;
        if !inserted {
            continue;
        }
        recorded += 1;

        // Advance the order's status from its recorded fills. Filled within
        // one lot of the order quantity counts as fully filled.
        let filled_qty: Decimal = store
            .fills_for_order(order.id)
            .await?
            .iter()
            .map(|fill| fill.qty)
            .sum();
        let status = if filled_qty >= order.qty - lot_size {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        store
            .set_order_fill_status(
                &order.client_order_id,
                status,
                (status == OrderStatus::Filled).then_some(executed_at),
            )
            .await?;
        info!(
            client_id = %order.client_order_id,
            price = %trade.price,
            qty = %trade.qty,
            status = ?status,
            "recorded fill"
        );
    }

    if recorded > 0 {
        debug!(basket = %basket, recorded, "trade sync complete");
    }
    Ok(recorded)
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
}
