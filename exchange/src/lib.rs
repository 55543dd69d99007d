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

//! # Exchange - Venue REST Client
//!
//! Signed, rate-limited, retrying access to the venue's spot REST surface.
//!
//! ## Main Components
//!
//! ### ExchangeApi
//! Unified interface over the handful of endpoints the trading loop needs
//! (account, open orders, place, cancel, price, trades, exchange info).
//! The production implementation is [`client::BinanceClient`]; tests swap in
//! an in-memory venue.
//!
//! ### TokenBucket
//! Request-weight rate limiter shared by every outbound call.
//!
//! ### FilterCache
//! Per-pair `{tick_size, lot_size, min_notional}` cache with a 24 h TTL.

pub mod client;
pub mod error;
pub mod filters;
pub mod model;
pub mod rate_limit;
pub mod signer;

pub use client::{BinanceClient, ExchangeApi, ExchangeConfig, PlaceOrder};
pub use error::ExchangeError;
pub use filters::{FilterCache, SymbolFilters};
pub use rate_limit::TokenBucket;
