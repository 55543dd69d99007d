use arara_markets::IdError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The grid configuration failed validation.
    #[error("invalid grid config: {reasons:?}")]
    Config { reasons: Vec<String> },

    /// A client order id could not be formed within the venue limit.
    #[error("client order id: {0}")]
    Id(#[from] IdError),
}
