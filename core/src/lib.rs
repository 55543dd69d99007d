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

//! # Core - The Control Loop
//!
//! Drives the venue's actual open-order set toward the strategy's intended
//! set, one basket at a time, on a fixed cadence:
//!
//! ```text
//! fetch -> sync fills -> strategy -> (reanchor once) -> reconcile -> gate -> execute
//! ```
//!
//! Cycle errors never escape the loop; everything the loop needs to resume
//! after a crash lives in the store.
//!
//! ## Components
//! - [`engine::Orchestrator`]: the loop itself
//! - [`executor::Executor`]: applies reconcile plans (cancel-then-create)
//! - [`emergency::EmergencyCloser`]: out-of-band cancel-all + safety exit
//! - [`gate::SystemStatusGate`]: persisted running/stopped toggle
//! - [`validate::OrderValidator`]: venue filter checks before placement

pub mod emergency;
pub mod engine;
pub mod error;
pub mod executor;
pub mod gate;
pub mod logging;
pub mod settings;
pub mod sync;
pub mod validate;

pub use emergency::{EmergencyCloseOutcome, EmergencyCloser};
pub use engine::Orchestrator;
pub use error::CoreError;
pub use executor::{ExecutionOutcome, Executor};
pub use gate::{SystemStatus, SystemStatusGate};
pub use settings::Settings;
pub use validate::{OrderValidator, ValidationError};
