//! The orchestrator loop.
//!
//! One cycle per cadence tick: fetch venue state, sync fills, plan, diff,
//! execute. Baskets are processed sequentially; a failing basket is logged
//! and the cycle moves on. The loop is paced by sleep (an over-budget cycle
//! is not compensated) and a shutdown signal is observed between cycles, so
//! the current cycle always runs to completion.

use crate::error::CoreError;
use crate::executor::Executor;
use crate::gate::{SystemStatus, SystemStatusGate};
use crate::sync::sync_fills;
use crate::validate::OrderValidator;
use arara_exchange::{ExchangeApi, FilterCache};
use arara_markets::ClientOrderId;
use arara_store::{net_position, Basket, Store};
use arara_strategy::plan::DUST_QTY;
use arara_strategy::{
    build_plan, reconcile, BasketState, FillView, GridConfig, MarketView, ObservedOrder,
    OrderSpec,
};
use chrono::{Duration as ChronoDuration, Utc};
use smol_str::SmolStr;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Balance snapshot cadence, in cycles.
const SNAPSHOT_EVERY: u64 = 10;

/// Trade-sync lookback window.
const SYNC_LOOKBACK_HOURS: i64 = 24;

/// Drives the control loop over every active basket.
#[derive(Debug)]
pub struct Orchestrator<C> {
    client: C,
    store: Store,
    filters: FilterCache,
    gate: SystemStatusGate,
    interval: Duration,
    cycle_count: u64,
}

impl<C> Orchestrator<C>
where
    C: ExchangeApi,
{
    pub fn new(client: C, store: Store, interval: Duration) -> Self {
        let gate = SystemStatusGate::new(store.clone());
        Self {
            client,
            store,
            filters: FilterCache::default(),
            gate,
            interval,
            cycle_count: 0,
        }
    }

    /// Run until `shutdown` flips to `true` (or its sender goes away). The
    /// cycle in flight completes before the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_s = self.interval.as_secs(), "orchestrator started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            if let Err(error) = self.cycle().await {
                error!(%error, "cycle failed");
            }
            debug!(
                cycle = self.cycle_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cycle complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("orchestrator stopped");
    }

    /// One pass over every active basket. Public so tools and tests can step
    /// the loop deterministically.
    pub async fn cycle(&mut self) -> Result<(), CoreError> {
        self.cycle_count += 1;
        let baskets = self.store.active_baskets().await?;
        if baskets.is_empty() {
            debug!("no active baskets");
            return Ok(());
        }

        for basket in &baskets {
            if let Err(error) = self.process_basket(basket).await {
                error!(basket = %basket.id, %error, "basket cycle failed");
            }
        }

        if self.cycle_count % SNAPSHOT_EVERY == 0 {
            if let Err(error) = self.snapshot_balances(&baskets[0]).await {
                warn!(%error, "balance snapshot failed");
            }
        }
        Ok(())
    }

    async fn process_basket(&self, basket: &Basket) -> Result<(), CoreError> {
        let mut config: GridConfig = serde_json::from_str(&basket.config_json)?;
        // The basket row owns the live anchor; the snapshot keeps the rest.
        config.anchor_price = basket.anchor_price;
        config.validate()?;

        let filters = self.filters.get(&self.client, &config.pair).await?;
        config.apply_filters(filters.tick_size, filters.lot_size, filters.min_notional);

        let account = self.client.account_info().await?;
        let open_orders = self.client.open_orders(&config.pair).await?;
        let last_price = self.client.current_price(&config.pair).await?;

        let now = Utc::now();
        let since_ms = (now - ChronoDuration::hours(SYNC_LOOKBACK_HOURS)).timestamp_millis();
        sync_fills(
            &self.client,
            &self.store,
            &basket.id,
            &config.pair,
            config.lot_size,
            since_ms,
        )
        .await?;

        let fills = self.store.fills_for_basket(&basket.id).await?;
        let position = net_position(&fills);
        let state = BasketState {
            basket: basket.id.clone(),
            quote_free: account.free(&config.quote_asset),
            base_free: account.free(&config.base_asset),
            position_base: position,
            fills: fills
                .iter()
                .map(|fill| FillView {
                    side: fill.side,
                    price: fill.price,
                    qty: fill.qty,
                })
                .collect(),
            created_at: basket.created_at,
        };
        let market = MarketView { last_price };

        let mut plan = build_plan(&config, &state, &market, now)?;
        if plan.meta.reanchor_suggested && position.abs() <= DUST_QTY {
            info!(
                basket = %basket.id,
                old_anchor = %config.anchor_price,
                new_anchor = %last_price,
                "reanchoring flat basket"
            );
            self.store
                .update_basket_anchor(&basket.id, last_price)
                .await?;
            config.anchor_price = last_price;
            plan = build_plan(&config, &state, &market, now)?;
        }

        let desired: Vec<OrderSpec> = plan.orders().cloned().collect();
        // Only this basket's namespace takes part in reconciliation; foreign
        // client ids on the same pair are left alone.
        let observed: Vec<ObservedOrder> = open_orders
            .iter()
            .filter(|order| ClientOrderId::belongs_to(&order.client_order_id, &basket.id))
            .map(|order| ObservedOrder {
                client_id: SmolStr::new(&order.client_order_id),
                price: order.price,
                qty: order.orig_qty,
            })
            .collect();

        let reconcile_plan = reconcile(&desired, &observed);
        debug!(
            basket = %basket.id,
            desired = desired.len(),
            observed = observed.len(),
            unchanged = reconcile_plan.counters.unchanged,
            to_cancel = reconcile_plan.to_cancel.len(),
            to_create = reconcile_plan.to_create.len(),
            avg_entry = ?plan.meta.avg_entry_price,
            filled_levels = plan.meta.filled_levels,
            "reconciled"
        );
        if reconcile_plan.is_empty() {
            return Ok(());
        }

        match self.gate.status().await? {
            SystemStatus::Stopped => {
                info!(basket = %basket.id, "system stopped; skipping execution");
            }
            SystemStatus::Running => {
                let validator = OrderValidator::new(filters);
                let outcome = Executor::new(&self.client, &self.store)
                    .apply(&config.pair, &basket.id, &validator, &reconcile_plan)
                    .await?;
                info!(
                    basket = %basket.id,
                    canceled = outcome.canceled,
                    created = outcome.created,
                    skipped = outcome.skipped,
                    failed = outcome.failed,
                    "plan applied"
                );
            }
        }
        Ok(())
    }

    /// Record free balances and their quote value, priced off the first
    /// active basket's pair.
    async fn snapshot_balances(&self, basket: &Basket) -> Result<(), CoreError> {
        let config: GridConfig = serde_json::from_str(&basket.config_json)?;
        let account = self.client.account_info().await?;
        let price = self.client.current_price(&config.pair).await?;
        let quote_free = account.free(&config.quote_asset);
        let base_free = account.free(&config.base_asset);
        self.store
            .insert_snapshot(quote_free, base_free, quote_free + base_free * price, Utc::now())
            .await?;
        debug!(%quote_free, %base_free, "balance snapshot recorded");
        Ok(())
    }
}
