//! Per-pair venue trading filters with a TTL cache.
//!
//! Filters change rarely; the venue publishes them through the exchange-info
//! endpoint. One fetch per pair per day keeps the request budget for trading.

use crate::client::ExchangeApi;
use crate::error::ExchangeError;
use crate::model::VenueFilter;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Default filter freshness window.
pub const FILTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The venue constraints an order spec must satisfy for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolFilters {
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_notional: Decimal,
}

/// Process-wide cache of [`SymbolFilters`] keyed by pair.
#[derive(Debug)]
pub struct FilterCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (SymbolFilters, Instant)>>,
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(FILTER_TTL)
    }
}

impl FilterCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached filters for `pair`, fetching through `client` when stale or
    /// absent.
    pub async fn get<C>(&self, client: &C, pair: &str) -> Result<SymbolFilters, ExchangeError>
    where
        C: ExchangeApi,
    {
        if let Some((filters, fetched_at)) = self.entries.read().await.get(pair) {
            if fetched_at.elapsed() < self.ttl {
                return Ok(*filters);
            }
        }

        let info = client.exchange_info(pair).await?;
        let symbol = info
            .symbols
            .into_iter()
            .find(|symbol| symbol.symbol == pair)
            .ok_or_else(|| {
                ExchangeError::Decode(format!("exchange info missing symbol {pair}"))
            })?;

        let mut filters = SymbolFilters::default();
        for filter in symbol.filters {
            match filter {
                VenueFilter::Price { tick_size } => filters.tick_size = tick_size,
                VenueFilter::LotSize { step_size } => filters.lot_size = step_size,
                VenueFilter::Notional { min_notional }
                | VenueFilter::MinNotional { min_notional } => {
                    filters.min_notional = min_notional
                }
                VenueFilter::Other => {}
            }
        }
        debug!(
            pair,
            tick = %filters.tick_size,
            lot = %filters.lot_size,
            min_notional = %filters.min_notional,
            "refreshed venue filters"
        );

        self.entries
            .write()
            .await
            .insert(pair.to_string(), (filters, Instant::now()));
        Ok(filters)
    }
}
