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

//! # Store - Durable Trading State
//!
//! SQLite-backed system of record for baskets, orders, fills, account
//! snapshots, and the small config key-value overlay. The trading loop is
//! crash-safe because everything it needs to resume lives here: a killed
//! process restarts, re-reads the venue, and continues identically.
//!
//! Orders are keyed by their globally unique client order id (the sole
//! reconciliation key); fills are keyed by the venue trade id so trade sync
//! is idempotent. Rows reference each other by id only.

pub mod error;
pub mod model;
pub mod store;

pub use error::StoreError;
pub use model::{
    Basket, BasketStatus, BalanceSnapshot, FillRecord, NewFill, NewOrder, OrderRecord,
    OrderStatus,
};
pub use store::{net_position, Store, StoreTx};
