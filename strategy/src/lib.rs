#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Strategy - Pure Grid Planning
//!
//! The deterministic heart of Arara. Two pure functions:
//!
//! * [`plan::build_plan`] — (config, state, market, now) → the orders that
//!   *should* exist on the venue right now, plus metadata.
//! * [`reconcile::reconcile`] — (desired, actual) → the minimal
//!   cancel/create plan that moves the venue toward the desired set.
//!
//! Neither function performs I/O, reads clocks, or mutates anything outside
//! its return value; the orchestrator supplies persisted state and a
//! timestamp, which is what keeps every cycle replayable.

pub mod config;
pub mod error;
pub mod numeric;
pub mod plan;
pub mod reconcile;

pub use config::{GridConfig, HardStopMode, PlaceMode, ReanchorRules};
pub use error::StrategyError;
pub use plan::{build_plan, BasketState, FillView, GridPlan, MarketView, OrderSpec, PlanMeta};
pub use reconcile::{reconcile, ObservedOrder, ReconcileCounters, ReconcilePlan};
