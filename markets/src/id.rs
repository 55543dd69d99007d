//! Basket ids and the client-order-id grammar.
//!
//! Every order Arara places carries a deterministic client order id:
//!
//! ```text
//! client_order_id := pair "_" basket_id "_" side_tag "_" slot
//! side_tag        := "B" | "S"
//! slot            := level index (1..N) | "TP1" | "TP2" | "TRAIL" | "EMERGENCY"
//! ```
//!
//! The id is the sole reconciliation key between the local order intent and
//! the venue's open-order set, so it must be reproducible from (pair, basket,
//! slot) alone and stay within the venue's 36-character limit.

use crate::side::Side;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Millisecond prefix width. Nine base-36 digits cover timestamps far beyond
/// any realistic deployment horizon while keeping ids lexicographically
/// sortable by creation time.
const TIME_WIDTH: usize = 9;
const ENTROPY_WIDTH: usize = 6;

/// Errors constructing or parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("identifier exceeds {max} characters: {id}")]
    TooLong { id: String, max: usize },
    #[error("identifier contains characters outside [A-Za-z0-9_]: {0}")]
    InvalidCharset(String),
    #[error("client order id does not match pair_basket_side_slot grammar: {0}")]
    Grammar(String),
    #[error("unknown slot segment: {0}")]
    UnknownSlot(String),
}

/// Unique id of one grid session (basket).
///
/// Short opaque string: a zero-padded base-36 unix-millisecond prefix
/// (time-ordered, sortable) followed by six random base-36 characters.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BasketId(SmolStr);

impl BasketId {
    /// Maximum accepted length. Anything longer would push the EMERGENCY slot
    /// of a seven-character pair past the venue's client-order-id limit.
    pub const MAX_LEN: usize = 22;

    /// Generate a fresh id. `now` is injected so creation stays reproducible
    /// in tests.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut raw = encode_base36(now.timestamp_millis().max(0) as u64, TIME_WIDTH);
        let mut rng = rand::rng();
        for _ in 0..ENTROPY_WIDTH {
            raw.push(BASE36[rng.random_range(0..BASE36.len())] as char);
        }
        Self(SmolStr::new(raw))
    }

    /// Validate and wrap an existing id (e.g. read back from the store).
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        let raw = raw.as_ref();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return Err(IdError::TooLong {
                id: raw.to_string(),
                max: Self::MAX_LEN,
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IdError::InvalidCharset(raw.to_string()));
        }
        Ok(Self(SmolStr::new(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BasketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_base36(mut value: u64, width: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    while digits.len() < width {
        digits.push(b'0');
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ascii")
}

/// Order slot within a basket's client-id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Grid buy level, 1-based.
    Level(u32),
    TakeProfit1,
    TakeProfit2,
    Trail,
    Emergency,
}

impl Slot {
    fn parse(segment: &str) -> Result<Self, IdError> {
        match segment {
            "TP1" => Ok(Slot::TakeProfit1),
            "TP2" => Ok(Slot::TakeProfit2),
            "TRAIL" => Ok(Slot::Trail),
            "EMERGENCY" => Ok(Slot::Emergency),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|index| *index >= 1)
                .map(Slot::Level)
                .ok_or_else(|| IdError::UnknownSlot(other.to_string())),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Level(index) => write!(f, "{index}"),
            Slot::TakeProfit1 => f.write_str("TP1"),
            Slot::TakeProfit2 => f.write_str("TP2"),
            Slot::Trail => f.write_str("TRAIL"),
            Slot::Emergency => f.write_str("EMERGENCY"),
        }
    }
}

/// Deterministic client order id echoed back by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(SmolStr);

/// Decomposed form of a well-formed [`ClientOrderId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClientOrderId {
    pub pair: SmolStr,
    pub basket: BasketId,
    pub side: Side,
    pub slot: Slot,
}

impl ClientOrderId {
    /// Venue limit on client order id length.
    pub const MAX_LEN: usize = 36;

    /// Id for grid buy level `index` (1-based).
    pub fn level(pair: &str, basket: &BasketId, index: u32) -> Result<Self, IdError> {
        Self::build(pair, basket, Side::Buy, Slot::Level(index))
    }

    pub fn take_profit_1(pair: &str, basket: &BasketId) -> Result<Self, IdError> {
        Self::build(pair, basket, Side::Sell, Slot::TakeProfit1)
    }

    pub fn take_profit_2(pair: &str, basket: &BasketId) -> Result<Self, IdError> {
        Self::build(pair, basket, Side::Sell, Slot::TakeProfit2)
    }

    pub fn trail(pair: &str, basket: &BasketId) -> Result<Self, IdError> {
        Self::build(pair, basket, Side::Sell, Slot::Trail)
    }

    pub fn emergency(pair: &str, basket: &BasketId) -> Result<Self, IdError> {
        Self::build(pair, basket, Side::Sell, Slot::Emergency)
    }

    fn build(pair: &str, basket: &BasketId, side: Side, slot: Slot) -> Result<Self, IdError> {
        if pair.is_empty() || !pair.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IdError::InvalidCharset(pair.to_string()));
        }
        let raw = format!("{pair}_{basket}_{tag}_{slot}", tag = side.tag());
        if raw.len() > Self::MAX_LEN {
            return Err(IdError::TooLong {
                id: raw,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(SmolStr::new(raw)))
    }

    /// Parse a venue-echoed id back into its components. Ids placed by other
    /// software on the same account fail here, which is how foreign orders
    /// are excluded from reconciliation.
    pub fn parse(raw: &str) -> Result<ParsedClientOrderId, IdError> {
        if raw.len() > Self::MAX_LEN {
            return Err(IdError::TooLong {
                id: raw.to_string(),
                max: Self::MAX_LEN,
            });
        }
        let mut segments = raw.split('_');
        let (Some(pair), Some(basket), Some(tag), Some(slot), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(IdError::Grammar(raw.to_string()));
        };
        let side = match tag {
            "B" => Side::Buy,
            "S" => Side::Sell,
            _ => return Err(IdError::Grammar(raw.to_string())),
        };
        if pair.is_empty() || !pair.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IdError::Grammar(raw.to_string()));
        }
        Ok(ParsedClientOrderId {
            pair: SmolStr::new(pair),
            basket: BasketId::new(basket)?,
            side,
            slot: Slot::parse(slot)?,
        })
    }

    /// Whether this id belongs to `basket`'s namespace.
    pub fn belongs_to(raw: &str, basket: &BasketId) -> bool {
        Self::parse(raw).is_ok_and(|parsed| &parsed.basket == basket)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
