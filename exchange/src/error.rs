//! Typed errors for venue communication.
//!
//! The taxonomy mirrors how callers branch: venue-rejected requests carry the
//! numeric code from the error envelope `{code, msg}`, transport and decode
//! failures are separate kinds, and the two benign codes get predicates so
//! the executor never matches on raw integers.

use thiserror::Error;

/// Venue error code for "order would duplicate an existing client id".
pub const CODE_DUPLICATE_ORDER: i32 = -2010;
/// Venue error code for "order does not exist".
pub const CODE_UNKNOWN_ORDER: i32 = -2013;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Venue rejected the request with its error envelope.
    #[error("venue rejected request (code {code}): {msg}")]
    Api { code: i32, msg: String },

    /// Venue responded, but the body did not decode into the expected shape.
    #[error("failed to decode venue response: {0}")]
    Decode(String),

    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("http transport: {0}")]
    Transport(String),

    /// The request could not be constructed.
    #[error("failed to build request: {0}")]
    BuildRequest(String),
}

impl ExchangeError {
    /// Create duplicate (code −2010): the order already exists under this
    /// client id. Treated as success by idempotent retries.
    pub fn is_duplicate_order(&self) -> bool {
        matches!(self, ExchangeError::Api { code, .. } if *code == CODE_DUPLICATE_ORDER)
    }

    /// Cancel unknown (code −2013): the venue no longer knows the order.
    pub fn is_unknown_order(&self) -> bool {
        matches!(self, ExchangeError::Api { code, .. } if *code == CODE_UNKNOWN_ORDER)
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(error: reqwest::Error) -> Self {
        ExchangeError::Transport(error.to_string())
    }
}
