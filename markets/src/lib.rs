#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Markets - Shared Vocabulary
//!
//! Core identifier and side types shared by every Arara crate.
//!
//! ## Modules
//! - `side`: order side enum with venue string conversions
//! - `id`: basket ids and the deterministic client-order-id grammar

pub mod id;
pub mod side;

pub use id::{BasketId, ClientOrderId, IdError, ParsedClientOrderId, Slot};
pub use side::Side;
