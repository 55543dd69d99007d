//! The grid planner.
//!
//! Pure function from (config, persisted basket state, market price, now) to
//! the order set that should exist on the venue. Iterative throughout; the
//! only time input is the caller-supplied `now`.

use arara_markets::{BasketId, ClientOrderId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use smol_str::SmolStr;

use crate::config::{GridConfig, HardStopMode, PlaceMode};
use crate::error::StrategyError;
use crate::numeric::{round_down, round_up, EPS};

/// Positions below this base quantity count as flat.
pub const DUST_QTY: Decimal = dec!(0.00001);

/// One desired order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub side: Side,
    /// Venue order type nomenclature.
    pub kind: SmolStr,
    pub price: Decimal,
    pub qty: Decimal,
    pub client_id: ClientOrderId,
}

impl OrderSpec {
    fn limit(side: Side, price: Decimal, qty: Decimal, client_id: ClientOrderId) -> Self {
        Self {
            side,
            kind: SmolStr::new_static("LIMIT"),
            price,
            qty,
            client_id,
        }
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.qty
    }
}

/// A fill as the planner sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillView {
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
}

/// Persisted basket state the planner runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketState {
    pub basket: BasketId,
    pub quote_free: Decimal,
    pub base_free: Decimal,
    /// Σ buy fills − Σ sell fills.
    pub position_base: Decimal,
    pub fills: Vec<FillView>,
    pub created_at: DateTime<Utc>,
}

/// Market inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketView {
    pub last_price: Decimal,
}

/// Planner metadata surfaced for logging and the reanchor decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMeta {
    pub basket: BasketId,
    /// VWAP of accumulated buy fills; `None` while flat.
    pub avg_entry_price: Option<Decimal>,
    pub filled_levels: usize,
    /// Levels that survived sizing and zone protection.
    pub planned_levels: usize,
    pub remaining_quote_budget: Decimal,
    /// Advisory: both plans empty and the basket is flat or stale.
    pub reanchor_suggested: bool,
}

/// The should-be order set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlan {
    pub buys: Vec<OrderSpec>,
    pub sells: Vec<OrderSpec>,
    pub meta: PlanMeta,
}

impl GridPlan {
    /// All desired orders, buys first.
    pub fn orders(&self) -> impl Iterator<Item = &OrderSpec> {
        self.buys.iter().chain(self.sells.iter())
    }
}

#[derive(Debug)]
struct Level {
    price: Decimal,
    qty: Decimal,
    client_id: ClientOrderId,
    filled: bool,
}

/// Compute the desired order set.
pub fn build_plan(
    config: &GridConfig,
    state: &BasketState,
    market: &MarketView,
    now: DateTime<Utc>,
) -> Result<GridPlan, StrategyError> {
    config.validate()?;

    let mut levels = build_levels(config, &state.basket)?;
    let (avg_entry_price, buy_spent) = mark_filled_levels(&mut levels, &state.fills, config);
    apply_zone_protection(&mut levels, config);

    let filled_levels = levels.iter().filter(|level| level.filled).count();
    let planned_levels = levels.len();

    let (buys, remaining_quote_budget) = plan_buys(config, state, market, &levels, buy_spent);
    let sells = plan_sells(config, state, avg_entry_price, filled_levels)?;

    let flat = state.position_base.abs() <= DUST_QTY;
    let age_s = (now - state.created_at).num_seconds().max(0) as u64;
    let stale = age_s > config.reanchor_rules.time_ttl_s;
    let reanchor_suggested = buys.is_empty() && sells.is_empty() && (flat || stale);

    Ok(GridPlan {
        buys,
        sells,
        meta: PlanMeta {
            basket: state.basket.clone(),
            avg_entry_price,
            filled_levels,
            planned_levels,
            remaining_quote_budget,
            reanchor_suggested,
        },
    })
}

/// Size every configured level, discarding those the venue would reject.
fn build_levels(config: &GridConfig, basket: &BasketId) -> Result<Vec<Level>, StrategyError> {
    let mut levels = Vec::with_capacity(config.levels_pct.len());
    for (i, (drop_pct, weight)) in config
        .levels_pct
        .iter()
        .zip(config.alloc_weights.iter())
        .enumerate()
    {
        let index = (i + 1) as u32;
        let factor = Decimal::ONE + *drop_pct / dec!(100);
        let price = round_down(config.anchor_price * factor, config.tick_size);
        if price <= Decimal::ZERO {
            continue;
        }
        let qty = round_down(
            config.max_grid_capital_quote * *weight / price,
            config.lot_size,
        );
        if qty <= Decimal::ZERO || qty * price < config.min_notional {
            continue;
        }
        levels.push(Level {
            price,
            qty,
            client_id: ClientOrderId::level(&config.pair, basket, index)?,
            filled: false,
        });
    }
    Ok(levels)
}

/// Traverse the fill history once: VWAP of buys, quote spent on buys, and
/// which levels a buy fill landed on (within one tick of the level price).
fn mark_filled_levels(
    levels: &mut [Level],
    fills: &[FillView],
    config: &GridConfig,
) -> (Option<Decimal>, Decimal) {
    let mut qty_total = Decimal::ZERO;
    let mut quote_total = Decimal::ZERO;
    for fill in fills.iter().filter(|fill| fill.side == Side::Buy) {
        qty_total += fill.qty;
        quote_total += fill.qty * fill.price;
        for level in levels.iter_mut() {
            if (fill.price - level.price).abs() <= config.tick_size + EPS {
                level.filled = true;
            }
        }
    }
    let avg = (qty_total > Decimal::ZERO).then(|| quote_total / qty_total);
    (avg, quote_total)
}

fn apply_zone_protection(levels: &mut Vec<Level>, config: &GridConfig) {
    match config.hard_stop_mode {
        HardStopMode::Hard => {
            let stop = config.anchor_price * (Decimal::ONE - config.hard_stop_pct);
            levels.retain(|level| level.price >= stop);
        }
        // The sparser second band below the main zone is not defined yet;
        // behaves like `None`.
        HardStopMode::ExtendZone | HardStopMode::None => {}
    }
}

fn plan_buys(
    config: &GridConfig,
    state: &BasketState,
    market: &MarketView,
    levels: &[Level],
    buy_spent: Decimal,
) -> (Vec<OrderSpec>, Decimal) {
    let mut candidates: Vec<&Level> = levels.iter().filter(|level| !level.filled).collect();
    match config.place_mode {
        PlaceMode::OnlyNextK => {
            // Closest under the current price first.
            candidates.sort_by(|a, b| b.price.cmp(&a.price));
            candidates.retain(|level| level.price <= market.last_price + EPS);
            candidates.truncate(config.k_next);
        }
        PlaceMode::AllUnfilled => {}
    }

    let mut available = state.quote_free;
    let mut budget = (config.max_grid_capital_quote - buy_spent).max(Decimal::ZERO);
    let mut buys = Vec::with_capacity(candidates.len());
    for level in candidates {
        let notional = level.price * level.qty;
        if notional <= available + EPS && notional <= budget + EPS {
            available -= notional;
            budget -= notional;
            buys.push(OrderSpec::limit(
                Side::Buy,
                level.price,
                level.qty,
                level.client_id.clone(),
            ));
        }
    }
    (buys, budget)
}

/// Up to three exit legs above VWAP. The take-profit percentage shrinks as
/// more levels fill, floored at `tp_min_pct`; the trailing leg is a plain
/// limit (no native trailing assumed).
fn plan_sells(
    config: &GridConfig,
    state: &BasketState,
    avg_entry_price: Option<Decimal>,
    filled_levels: usize,
) -> Result<Vec<OrderSpec>, StrategyError> {
    let position = state.position_base;
    let Some(avg) = avg_entry_price else {
        return Ok(Vec::new());
    };
    if position <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let steps = Decimal::from(filled_levels.saturating_sub(1) as u64);
    let tp = (config.tp_start_pct - config.tp_step_pct * steps).max(config.tp_min_pct);

    let tp1_price = round_up(avg * (Decimal::ONE + tp), config.tick_size);
    let tp2_price = round_up(
        avg * (Decimal::ONE + tp + config.tp2_delta_pct),
        config.tick_size,
    );
    let trail_price = round_up(
        avg * (Decimal::ONE + config.trailing_callback_pct),
        config.tick_size,
    );

    let q1 = round_down(position * config.tp1_share, config.lot_size);
    let q2 = round_down(position * config.tp2_share, config.lot_size);
    let q3 = round_down(position - q1 - q2, config.lot_size);

    let mut sells = Vec::with_capacity(3);
    if q1 > Decimal::ZERO {
        sells.push(OrderSpec::limit(
            Side::Sell,
            tp1_price,
            q1,
            ClientOrderId::take_profit_1(&config.pair, &state.basket)?,
        ));
    }
    if q2 > Decimal::ZERO {
        sells.push(OrderSpec::limit(
            Side::Sell,
            tp2_price,
            q2,
            ClientOrderId::take_profit_2(&config.pair, &state.basket)?,
        ));
    }
    if q3 > Decimal::ZERO {
        sells.push(OrderSpec::limit(
            Side::Sell,
            trail_price,
            q3,
            ClientOrderId::trail(&config.pair, &state.basket)?,
        ));
    }
    Ok(sells)
}
