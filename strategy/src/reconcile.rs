//! Desired-vs-observed order diffing.
//!
//! Pure set diff keyed by client order id. An order observed on the venue is
//! kept only when a desired order with the same id, price, and quantity
//! exists; anything else becomes a cancel, a create, or both (re-price).

use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashMap;

use crate::numeric::approx_eq;
use crate::plan::OrderSpec;

/// A venue-observed open order, reduced to what the diff needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedOrder {
    pub client_id: SmolStr,
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileCounters {
    pub canceled: usize,
    pub created: usize,
    pub unchanged: usize,
}

/// The minimal mutation plan. Cancels are applied before creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_cancel: Vec<SmolStr>,
    pub to_create: Vec<OrderSpec>,
    pub counters: ReconcileCounters,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_cancel.is_empty() && self.to_create.is_empty()
    }
}

fn needs_update(desired: &OrderSpec, actual: &ObservedOrder) -> bool {
    !approx_eq(desired.price, actual.price) || !approx_eq(desired.qty, actual.qty)
}

/// Diff `desired` against `actual`.
pub fn reconcile(desired: &[OrderSpec], actual: &[ObservedOrder]) -> ReconcilePlan {
    let desired_by_id: HashMap<&str, &OrderSpec> = desired
        .iter()
        .map(|spec| (spec.client_id.as_str(), spec))
        .collect();
    let actual_by_id: HashMap<&str, &ObservedOrder> = actual
        .iter()
        .map(|order| (order.client_id.as_str(), order))
        .collect();

    let mut plan = ReconcilePlan {
        to_cancel: Vec::new(),
        to_create: Vec::new(),
        counters: ReconcileCounters::default(),
    };

    for observed in actual {
        match desired_by_id.get(observed.client_id.as_str()) {
            Some(spec) if !needs_update(spec, observed) => plan.counters.unchanged += 1,
            _ => {
                plan.to_cancel.push(observed.client_id.clone());
                plan.counters.canceled += 1;
            }
        }
    }

    for spec in desired {
        match actual_by_id.get(spec.client_id.as_str()) {
            Some(observed) if !needs_update(spec, observed) => {}
            _ => {
                plan.to_create.push(spec.clone());
                plan.counters.created += 1;
            }
        }
    }

    plan
}
