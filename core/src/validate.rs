//! Local enforcement of venue trading filters.
//!
//! The venue re-checks everything; this is the cheap pre-flight that keeps
//! obviously rejectable specs from costing a request.

use arara_exchange::SymbolFilters;
use arara_strategy::numeric::is_step_multiple;
use arara_strategy::OrderSpec;
use thiserror::Error;

/// An order spec that failed filter validation, with every reason collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("order spec rejected: {}", reasons.join("; "))]
pub struct ValidationError {
    pub reasons: Vec<String>,
}

/// Validates order specs against one pair's venue filters.
#[derive(Debug, Clone, Copy)]
pub struct OrderValidator {
    filters: SymbolFilters,
}

impl OrderValidator {
    pub fn new(filters: SymbolFilters) -> Self {
        Self { filters }
    }

    pub fn validate(&self, spec: &OrderSpec) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();
        if !is_step_multiple(spec.price, self.filters.tick_size) {
            reasons.push(format!(
                "price {} is not a multiple of tick size {}",
                spec.price, self.filters.tick_size
            ));
        }
        if !is_step_multiple(spec.qty, self.filters.lot_size) {
            reasons.push(format!(
                "qty {} is not a multiple of lot size {}",
                spec.qty, self.filters.lot_size
            ));
        }
        if spec.notional() < self.filters.min_notional {
            reasons.push(format!(
                "notional {} is below the minimum {}",
                spec.notional(),
                self.filters.min_notional
            ));
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { reasons })
        }
    }
}
