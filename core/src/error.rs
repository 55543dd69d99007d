//! Aggregated error type for the control loop.

use crate::validate::ValidationError;
use arara_exchange::ExchangeError;
use arara_store::StoreError;
use arara_strategy::StrategyError;
use thiserror::Error;

/// Central error type for the trading loop. One cycle's failure is logged
/// and absorbed by the orchestrator; nothing here aborts the bot.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("exchange: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    /// A persisted basket config blob no longer deserializes.
    #[error("basket config: {0}")]
    BasketConfig(#[from] serde_json::Error),

    #[error("settings: {0}")]
    Settings(String),
}
