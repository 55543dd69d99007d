//! Grid configuration.
//!
//! The per-basket configuration snapshot is a typed record; unknown keys are
//! rejected so a misspelled knob fails at load instead of silently using a
//! default. Units are fixed here once:
//!
//! * `levels_pct` — **percent** drops below the anchor (−5 ⇒ 0.95·P₀).
//!   Fraction-style magnitudes (|v| < 1) are rejected at validation.
//! * take-profit, trailing, and hard-stop parameters — **fractions**
//!   (0.012 ⇒ 1.2%).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Weight/share sums must land within this distance of 1.0.
const SUM_TOLERANCE: Decimal = dec!(0.000001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardStopMode {
    #[default]
    None,
    /// Drop every level priced below P₀·(1 − hard_stop_pct).
    Hard,
    /// Reserved: a sparser second band below the main zone. Currently
    /// behaves like `None`.
    ExtendZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceMode {
    /// Keep every unfilled level on the book.
    #[default]
    AllUnfilled,
    /// Only the `k_next` levels closest under the current price.
    OnlyNextK,
}

/// Reanchor triggers. `close_ratio` is carried but not yet evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReanchorRules {
    #[serde(default)]
    pub close_ratio: Decimal,
    /// Basket age after which an empty plan suggests reanchoring.
    pub time_ttl_s: u64,
}

impl Default for ReanchorRules {
    fn default() -> Self {
        Self {
            close_ratio: Decimal::ZERO,
            time_ttl_s: 24 * 60 * 60,
        }
    }
}

/// One basket's grid parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Trading pair symbol, e.g. "SOLUSDC".
    pub pair: String,
    /// Base asset of the pair, e.g. "SOL".
    pub base_asset: String,
    /// Quote asset of the pair, e.g. "USDC".
    pub quote_asset: String,

    /// Anchor price the level drops hang from.
    #[serde(rename = "anchor_price_p0")]
    pub anchor_price: Decimal,
    /// Ordered level drops in percent, all negative, e.g. [-5, -10, -30].
    pub levels_pct: Vec<Decimal>,
    /// Capital share per level; same length as `levels_pct`, sums to 1.0.
    pub alloc_weights: Vec<Decimal>,
    /// Quote capital the whole grid may commit.
    pub max_grid_capital_quote: Decimal,

    /// Venue filters; overwritten from the filter cache before planning.
    #[serde(default)]
    pub tick_size: Decimal,
    #[serde(default)]
    pub lot_size: Decimal,
    #[serde(default)]
    pub min_notional: Decimal,

    /// Dynamic take-profit curve (fractions).
    pub tp_start_pct: Decimal,
    pub tp_step_pct: Decimal,
    pub tp_min_pct: Decimal,
    /// TP2 offset above TP1 (fraction).
    pub tp2_delta_pct: Decimal,

    /// Exit portions; sum to 1.0.
    pub tp1_share: Decimal,
    pub tp2_share: Decimal,
    pub trail_share: Decimal,
    /// Price offset of the simulated trailing leg (fraction).
    pub trailing_callback_pct: Decimal,

    #[serde(default)]
    pub hard_stop_mode: HardStopMode,
    /// Zone depth for `hard_stop_mode = hard` (fraction).
    #[serde(default)]
    pub hard_stop_pct: Decimal,

    #[serde(default)]
    pub place_mode: PlaceMode,
    /// Breadth for `place_mode = only_next_k`.
    #[serde(default = "default_k_next")]
    pub k_next: usize,

    #[serde(default)]
    pub reanchor_rules: ReanchorRules,
}

fn default_k_next() -> usize {
    2
}

impl GridConfig {
    /// Validate structural invariants. Called on load and again before every
    /// plan, so a hand-edited snapshot cannot reach the planner.
    pub fn validate(&self) -> Result<(), StrategyError> {
        let mut reasons = Vec::new();

        if self.pair.is_empty() || self.pair != format!("{}{}", self.base_asset, self.quote_asset)
        {
            reasons.push(format!(
                "pair {:?} must be base_asset + quote_asset ({:?} + {:?})",
                self.pair, self.base_asset, self.quote_asset
            ));
        }
        if self.anchor_price <= Decimal::ZERO {
            reasons.push(format!("anchor_price_p0 must be positive, got {}", self.anchor_price));
        }
        if self.max_grid_capital_quote <= Decimal::ZERO {
            reasons.push(format!(
                "max_grid_capital_quote must be positive, got {}",
                self.max_grid_capital_quote
            ));
        }

        if self.levels_pct.is_empty() {
            reasons.push("levels_pct must not be empty".to_string());
        }
        if self.levels_pct.len() != self.alloc_weights.len() {
            reasons.push(format!(
                "levels_pct has {} entries but alloc_weights has {}",
                self.levels_pct.len(),
                self.alloc_weights.len()
            ));
        }
        for drop in &self.levels_pct {
            if *drop >= Decimal::ZERO {
                reasons.push(format!("level drop {drop} must be negative"));
            } else if drop.abs() < Decimal::ONE {
                // −0.05 almost certainly means −5%; refuse to guess.
                reasons.push(format!(
                    "level drop {drop} looks like a fraction; levels_pct is in percent"
                ));
            } else if drop.abs() >= dec!(100) {
                reasons.push(format!("level drop {drop} would cross zero"));
            }
        }

        let weight_sum: Decimal = self.alloc_weights.iter().copied().sum();
        if (weight_sum - Decimal::ONE).abs() > SUM_TOLERANCE {
            reasons.push(format!("alloc_weights sum to {weight_sum}, expected 1.0"));
        }
        if self.alloc_weights.iter().any(|w| *w <= Decimal::ZERO) {
            reasons.push("alloc_weights must all be positive".to_string());
        }

        let share_sum = self.tp1_share + self.tp2_share + self.trail_share;
        if (share_sum - Decimal::ONE).abs() > SUM_TOLERANCE {
            reasons.push(format!(
                "exit shares sum to {share_sum}, expected 1.0 (tp1 + tp2 + trail)"
            ));
        }
        if self.tp_min_pct > self.tp_start_pct {
            reasons.push(format!(
                "tp_min_pct {} exceeds tp_start_pct {}",
                self.tp_min_pct, self.tp_start_pct
            ));
        }
        if self.tp_start_pct < Decimal::ZERO
            || self.tp_step_pct < Decimal::ZERO
            || self.tp_min_pct < Decimal::ZERO
            || self.tp2_delta_pct < Decimal::ZERO
            || self.trailing_callback_pct < Decimal::ZERO
        {
            reasons.push("take-profit parameters must be non-negative".to_string());
        }

        if self.place_mode == PlaceMode::OnlyNextK && self.k_next == 0 {
            reasons.push("k_next must be at least 1 for place_mode only_next_k".to_string());
        }
        if self.hard_stop_mode == HardStopMode::Hard
            && (self.hard_stop_pct <= Decimal::ZERO || self.hard_stop_pct >= Decimal::ONE)
        {
            reasons.push(format!(
                "hard_stop_pct must be a fraction in (0, 1), got {}",
                self.hard_stop_pct
            ));
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(StrategyError::Config { reasons })
        }
    }

    /// Overlay venue filters fetched from the exchange.
    pub fn apply_filters(&mut self, tick_size: Decimal, lot_size: Decimal, min_notional: Decimal) {
        self.tick_size = tick_size;
        self.lot_size = lot_size;
        self.min_notional = min_notional;
    }
}
