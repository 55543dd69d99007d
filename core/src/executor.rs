//! Applies a reconcile plan through the venue.
//!
//! Always cancel-then-create: freeing balance first prevents venue-side
//! insufficient-balance rejections when an order is re-priced. Benign venue
//! codes (duplicate create, unknown cancel) are absorbed; anything else is
//! logged and the rest of the plan continues.

use crate::error::CoreError;
use crate::validate::OrderValidator;
use arara_markets::BasketId;
use arara_exchange::{ExchangeApi, PlaceOrder};
use arara_store::{NewOrder, OrderStatus, Store};
use arara_strategy::ReconcilePlan;
use tracing::{debug, warn};

/// What one plan application actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    pub canceled: usize,
    pub created: usize,
    /// Specs dropped by local validation.
    pub skipped: usize,
    /// Specs the venue rejected outright.
    pub failed: usize,
}

/// Applies reconcile plans for one basket.
#[derive(Debug)]
pub struct Executor<'a, C> {
    client: &'a C,
    store: &'a Store,
}

impl<'a, C> Executor<'a, C>
where
    C: ExchangeApi,
{
    pub fn new(client: &'a C, store: &'a Store) -> Self {
        Self { client, store }
    }

    pub async fn apply(
        &self,
        pair: &str,
        basket: &BasketId,
        validator: &OrderValidator,
        plan: &ReconcilePlan,
    ) -> Result<ExecutionOutcome, CoreError> {
        let mut outcome = ExecutionOutcome::default();

        for client_id in &plan.to_cancel {
            match self.client.cancel_order(pair, client_id).await {
                Ok(_) => {}
                Err(error) if error.is_unknown_order() => {
                    debug!(%client_id, "cancel target already gone");
                }
                Err(error) => {
                    warn!(%client_id, %error, "cancel failed");
                    outcome.failed += 1;
                    continue;
                }
            }
            // Locally canceled in both the confirmed and already-gone cases.
            self.store.mark_order_canceled(client_id).await?;
            outcome.canceled += 1;
        }

        for spec in &plan.to_create {
            if let Err(error) = validator.validate(spec) {
                warn!(client_id = %spec.client_id, %error, "spec failed filter validation");
                outcome.skipped += 1;
                continue;
            }

            let request = PlaceOrder {
                pair: pair.to_string(),
                side: spec.side,
                order_type: spec.kind.to_string(),
                price: spec.price,
                qty: spec.qty,
                client_id: spec.client_id.to_string(),
                time_in_force: "GTC".to_string(),
            };
            let venue_order_id = match self.client.place_order(&request).await {
                Ok(ack) => Some(ack.order_id),
                Err(error) if error.is_duplicate_order() => {
                    // Idempotent retry: the venue already holds this id.
                    debug!(client_id = %spec.client_id, "order already exists");
                    None
                }
                Err(error) => {
                    warn!(client_id = %spec.client_id, %error, "place failed");
                    outcome.failed += 1;
                    continue;
                }
            };

            self.store
                .upsert_order(&NewOrder {
                    basket_id: basket.clone(),
                    venue_order_id,
                    client_order_id: spec.client_id.to_string(),
                    side: spec.side,
                    order_type: spec.kind.to_string(),
                    price: spec.price,
                    qty: spec.qty,
                    status: OrderStatus::New,
                })
                .await?;
            outcome.created += 1;
        }

        Ok(outcome)
    }
}
