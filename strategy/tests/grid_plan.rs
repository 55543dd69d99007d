//! End-to-end planner scenarios with literal numbers.

use arara_markets::{BasketId, Side};
use arara_strategy::{
    build_plan, BasketState, FillView, GridConfig, HardStopMode, MarketView, PlaceMode,
    ReanchorRules,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn six_level_config() -> GridConfig {
    GridConfig {
        pair: "SOLUSDC".to_string(),
        base_asset: "SOL".to_string(),
        quote_asset: "USDC".to_string(),
        anchor_price: dec!(150.000),
        levels_pct: vec![dec!(-5), dec!(-10), dec!(-15), dec!(-20), dec!(-25), dec!(-30)],
        alloc_weights: vec![
            dec!(0.08),
            dec!(0.12),
            dec!(0.15),
            dec!(0.18),
            dec!(0.22),
            dec!(0.25),
        ],
        max_grid_capital_quote: dec!(1000),
        tick_size: dec!(0.001),
        lot_size: dec!(0.01),
        min_notional: dec!(5.0),
        tp_start_pct: dec!(0.012),
        tp_step_pct: dec!(0.0015),
        tp_min_pct: dec!(0.003),
        tp2_delta_pct: dec!(0.008),
        tp1_share: dec!(0.4),
        tp2_share: dec!(0.35),
        trail_share: dec!(0.25),
        trailing_callback_pct: dec!(0.005),
        hard_stop_mode: HardStopMode::None,
        hard_stop_pct: Decimal::ZERO,
        place_mode: PlaceMode::OnlyNextK,
        k_next: 2,
        reanchor_rules: ReanchorRules::default(),
    }
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap()
}

fn flat_state(quote_free: Decimal) -> BasketState {
    BasketState {
        basket: BasketId::new("b00000001").unwrap(),
        quote_free,
        base_free: Decimal::ZERO,
        position_base: Decimal::ZERO,
        fills: Vec::new(),
        created_at: created_at(),
    }
}

fn buy_fill(price: Decimal, qty: Decimal) -> FillView {
    FillView {
        side: Side::Buy,
        price,
        qty,
    }
}

/// Fresh six-level grid, nothing filled, price just under the anchor:
/// only the two nearest levels go on the book.
#[test]
fn fresh_grid_places_the_next_two_levels() {
    let config = six_level_config();
    let state = flat_state(dec!(10000));
    let market = MarketView {
        last_price: dec!(148),
    };

    let plan = build_plan(&config, &state, &market, now()).unwrap();

    assert_eq!(plan.buys.len(), 2);
    assert_eq!(plan.buys[0].price, dec!(142.500));
    assert_eq!(plan.buys[0].qty, dec!(0.56));
    assert_eq!(plan.buys[0].client_id.as_str(), "SOLUSDC_b00000001_B_1");
    assert_eq!(plan.buys[1].price, dec!(135.000));
    assert_eq!(plan.buys[1].qty, dec!(0.88));
    assert_eq!(plan.buys[1].client_id.as_str(), "SOLUSDC_b00000001_B_2");

    assert!(plan.sells.is_empty());
    assert_eq!(plan.meta.planned_levels, 6);
    assert_eq!(plan.meta.filled_levels, 0);
    assert!(!plan.meta.reanchor_suggested);
    assert_eq!(plan.meta.avg_entry_price, None);
    // 1000 − 142.5·0.56 − 135·0.88
    assert_eq!(plan.meta.remaining_quote_budget, dec!(801.400));
}

/// First three levels filled: exits ladder above VWAP with the shrunk
/// take-profit, split 40/35/25 and rounded down to the lot.
#[test]
fn three_filled_levels_produce_the_exit_ladder() {
    let config = six_level_config();
    let state = BasketState {
        basket: BasketId::new("b00000001").unwrap(),
        quote_free: dec!(500),
        base_free: dec!(2.61),
        position_base: dec!(2.61),
        fills: vec![
            buy_fill(dec!(142.500), dec!(0.56)),
            buy_fill(dec!(135.000), dec!(0.88)),
            buy_fill(dec!(127.500), dec!(1.17)),
        ],
        created_at: created_at(),
    };
    let market = MarketView {
        last_price: dec!(126),
    };

    let plan = build_plan(&config, &state, &market, now()).unwrap();

    assert_eq!(plan.meta.filled_levels, 3);
    let avg = plan.meta.avg_entry_price.unwrap();
    assert!((avg - dec!(133.2471)).abs() < dec!(0.0001), "avg {avg}");

    // TP = 0.012 − 0.0015·2 = 0.009.
    assert_eq!(plan.sells.len(), 3);
    let tp1 = &plan.sells[0];
    assert_eq!(tp1.client_id.as_str(), "SOLUSDC_b00000001_S_TP1");
    assert_eq!(tp1.price, dec!(134.447));
    assert_eq!(tp1.qty, dec!(1.04));

    let tp2 = &plan.sells[1];
    assert_eq!(tp2.client_id.as_str(), "SOLUSDC_b00000001_S_TP2");
    assert_eq!(tp2.price, dec!(135.513));
    assert_eq!(tp2.qty, dec!(0.91));

    let trail = &plan.sells[2];
    assert_eq!(trail.client_id.as_str(), "SOLUSDC_b00000001_S_TRAIL");
    assert_eq!(trail.price, dec!(133.914));
    assert_eq!(trail.qty, dec!(0.66));

    // Exit quantities never exceed the position.
    assert!(tp1.qty + tp2.qty + trail.qty <= state.position_base);

    // Two next levels below the market go on the book.
    assert_eq!(plan.buys.len(), 2);
    assert_eq!(plan.buys[0].price, dec!(120.000));
    assert_eq!(plan.buys[1].price, dec!(112.500));
}

#[test]
fn buy_notional_respects_capital_and_balance() {
    let mut config = six_level_config();
    config.place_mode = PlaceMode::AllUnfilled;
    let market = MarketView {
        last_price: dec!(148),
    };

    // Ample balance: every level fits, total stays within the grid capital.
    let plan = build_plan(&config, &flat_state(dec!(100000)), &market, now()).unwrap();
    assert_eq!(plan.buys.len(), 6);
    let total: Decimal = plan.buys.iter().map(|buy| buy.notional()).sum();
    assert!(total <= config.max_grid_capital_quote * dec!(1.000001));

    // Tight balance: only what the free quote can pay for is planned.
    let plan = build_plan(&config, &flat_state(dec!(200)), &market, now()).unwrap();
    let total: Decimal = plan.buys.iter().map(|buy| buy.notional()).sum();
    assert!(total <= dec!(200));
    assert!(!plan.buys.is_empty());
}

#[test]
fn planned_orders_sit_on_venue_steps() {
    let mut config = six_level_config();
    config.place_mode = PlaceMode::AllUnfilled;
    let state = BasketState {
        basket: BasketId::new("b00000001").unwrap(),
        quote_free: dec!(10000),
        base_free: dec!(2.61),
        position_base: dec!(2.61),
        fills: vec![
            buy_fill(dec!(142.500), dec!(0.56)),
            buy_fill(dec!(135.000), dec!(0.88)),
            buy_fill(dec!(127.500), dec!(1.17)),
        ],
        created_at: created_at(),
    };
    let market = MarketView {
        last_price: dec!(126),
    };

    let plan = build_plan(&config, &state, &market, now()).unwrap();
    for spec in plan.orders() {
        assert!(
            (spec.price / config.tick_size).fract().is_zero(),
            "{} off tick",
            spec.price
        );
        assert!(
            (spec.qty / config.lot_size).fract().is_zero(),
            "{} off lot",
            spec.qty
        );
        assert!(spec.notional() >= config.min_notional || spec.side == Side::Sell);
    }
}

#[test]
fn take_profit_never_drops_below_the_floor() {
    let mut config = six_level_config();
    config.tp_step_pct = dec!(0.003);
    let fills: Vec<FillView> = vec![
        buy_fill(dec!(142.500), dec!(0.56)),
        buy_fill(dec!(135.000), dec!(0.88)),
        buy_fill(dec!(127.500), dec!(1.17)),
        buy_fill(dec!(120.000), dec!(1.50)),
        buy_fill(dec!(112.500), dec!(1.95)),
        buy_fill(dec!(105.000), dec!(2.38)),
    ];
    let position: Decimal = fills.iter().map(|fill| fill.qty).sum();
    let quote: Decimal = fills.iter().map(|fill| fill.qty * fill.price).sum();
    let avg = quote / position;

    let state = BasketState {
        basket: BasketId::new("b00000001").unwrap(),
        quote_free: Decimal::ZERO,
        base_free: position,
        position_base: position,
        fills,
        created_at: created_at(),
    };
    let market = MarketView {
        last_price: dec!(100),
    };

    let plan = build_plan(&config, &state, &market, now()).unwrap();
    assert_eq!(plan.meta.filled_levels, 6);
    // 0.012 − 0.003·5 < tp_min, so TP1 sits exactly tp_min above VWAP.
    let expected = (avg * (Decimal::ONE + config.tp_min_pct) / config.tick_size).ceil()
        * config.tick_size;
    assert_eq!(plan.sells[0].price, expected);
}

#[test]
fn hard_stop_drops_levels_below_the_zone() {
    let mut config = six_level_config();
    config.hard_stop_mode = HardStopMode::Hard;
    config.hard_stop_pct = dec!(0.12);
    let market = MarketView {
        last_price: dec!(131),
    };

    let plan = build_plan(&config, &flat_state(dec!(10000)), &market, now()).unwrap();
    // Stop at 150·0.88 = 132: only the −5% and −10% levels survive, and with
    // the price already below the stop nothing is placed.
    assert_eq!(plan.meta.planned_levels, 2);
    assert!(plan.buys.is_empty());
    assert!(plan.sells.is_empty());
}

#[test]
fn empty_plans_on_a_flat_basket_suggest_reanchor() {
    let config = six_level_config();
    // Price below every level: only_next_k finds no candidate.
    let market = MarketView {
        last_price: dec!(90),
    };

    let plan = build_plan(&config, &flat_state(dec!(10000)), &market, now()).unwrap();
    assert!(plan.buys.is_empty());
    assert!(plan.sells.is_empty());
    assert!(plan.meta.reanchor_suggested);
}

#[test]
fn stale_basket_with_dust_exits_suggests_reanchor() {
    let mut config = six_level_config();
    config.reanchor_rules.time_ttl_s = 1800;
    // Position too small for any exit leg after lot rounding.
    let state = BasketState {
        basket: BasketId::new("b00000001").unwrap(),
        quote_free: Decimal::ZERO,
        base_free: dec!(0.005),
        position_base: dec!(0.005),
        fills: vec![buy_fill(dec!(142.500), dec!(0.005))],
        created_at: created_at(),
    };
    let market = MarketView {
        last_price: dec!(90),
    };

    // One hour old with a 30 minute TTL.
    let plan = build_plan(&config, &state, &market, now()).unwrap();
    assert!(plan.buys.is_empty());
    assert!(plan.sells.is_empty());
    assert!(plan.meta.reanchor_suggested);

    // Same basket well inside the TTL: no suggestion (position is not flat).
    config.reanchor_rules.time_ttl_s = 7200;
    let plan = build_plan(&config, &state, &market, now()).unwrap();
    assert!(!plan.meta.reanchor_suggested);
}

#[test]
fn planner_is_deterministic() {
    let config = six_level_config();
    let state = flat_state(dec!(10000));
    let market = MarketView {
        last_price: dec!(148),
    };

    let first = build_plan(&config, &state, &market, now()).unwrap();
    let second = build_plan(&config, &state, &market, now()).unwrap();
    assert_eq!(first, second);
}
