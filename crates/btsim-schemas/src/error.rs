//! Wire-serializable error hierarchy.
//!
//! Each variant carries a stable machine `code()`; the human `message()` is
//! informational only (clients reconstruct behavior from the code, never by
//! parsing the message). No variant is retried inside the engine: a failed
//! operation always leaves an account completely unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level error kind, hierarchical per the four families the trading
/// counter distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BtsimError {
    BadParameter(BadParameter),
    TradeRejected(TradeRejected),
    AccountError(AccountError),
    Infra(Infra),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadParameter {
    LotSize,
    TimeRewind,
    UnknownSymbol,
    BadDatetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeRejected {
    CashShortage,
    PositionShort,
    NoMatch,
    VolumeNotEnough,
    PriceLimit,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    AccountExists,
    NotFound,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infra {
    FeedTimeout,
    FeedDataMissing,
    Persistence(String),
}

impl BtsimError {
    /// The stable machine code a client library matches on. Never changes
    /// across releases within the same error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BtsimError::BadParameter(e) => match e {
                BadParameter::LotSize => "LOT_SIZE",
                BadParameter::TimeRewind => "TIME_REWIND",
                BadParameter::UnknownSymbol => "UNKNOWN_SYMBOL",
                BadParameter::BadDatetime => "BAD_DATETIME",
            },
            BtsimError::TradeRejected(e) => match e {
                TradeRejected::CashShortage => "CASH_SHORTAGE",
                TradeRejected::PositionShort => "POSITION_SHORT",
                TradeRejected::NoMatch => "NO_MATCH",
                TradeRejected::VolumeNotEnough => "VOLUME_NOT_ENOUGH",
                TradeRejected::PriceLimit => "PRICE_LIMIT",
                TradeRejected::Suspended => "SUSPENDED",
            },
            BtsimError::AccountError(e) => match e {
                AccountError::AccountExists => "ACCOUNT_EXISTS",
                AccountError::NotFound => "NOT_FOUND",
                AccountError::Unauthorized => "UNAUTHORIZED",
            },
            BtsimError::Infra(e) => match e {
                Infra::FeedTimeout => "FEED_TIMEOUT",
                Infra::FeedDataMissing => "FEED_DATA_MISSING",
                Infra::Persistence(_) => "PERSISTENCE",
            },
        }
    }

    /// Human-readable message. Informational only; never parsed by clients.
    pub fn message(&self) -> String {
        match self {
            BtsimError::BadParameter(BadParameter::LotSize) => {
                "buy quantity must be a multiple of 100 shares".to_string()
            }
            BtsimError::BadParameter(BadParameter::TimeRewind) => {
                "order_time must strictly increase over the account's prior orders".to_string()
            }
            BtsimError::BadParameter(BadParameter::UnknownSymbol) => {
                "symbol is not recognized by the feed".to_string()
            }
            BtsimError::BadParameter(BadParameter::BadDatetime) => {
                "order_time could not be parsed".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::CashShortage) => {
                "insufficient cash to settle this buy".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::PositionShort) => {
                "insufficient shares held to settle this sell".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::NoMatch) => {
                "no bar crossed the requested price".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::VolumeNotEnough) => {
                "a matching bar reported zero volume".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::PriceLimit) => {
                "the symbol is at its daily price limit".to_string()
            }
            BtsimError::TradeRejected(TradeRejected::Suspended) => {
                "the symbol is suspended from trading".to_string()
            }
            BtsimError::AccountError(AccountError::AccountExists) => {
                "an account with this name or token already exists".to_string()
            }
            BtsimError::AccountError(AccountError::NotFound) => {
                "no account or saved snapshot matches this request".to_string()
            }
            BtsimError::AccountError(AccountError::Unauthorized) => {
                "token is unknown or does not authorize this operation".to_string()
            }
            BtsimError::Infra(Infra::FeedTimeout) => {
                "the market-data feed did not respond in time".to_string()
            }
            BtsimError::Infra(Infra::FeedDataMissing) => {
                "the market-data feed has no data for this request".to_string()
            }
            BtsimError::Infra(Infra::Persistence(detail)) => {
                format!("persistence backend error: {detail}")
            }
        }
    }
}

impl fmt::Display for BtsimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for BtsimError {}

/// Wire shape for `BtsimError`: `{ "code": ..., "message": ... }`, matching
/// "serializable across the wire so a client library can
/// reconstruct the subclass".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&BtsimError> for ErrorBody {
    fn from(e: &BtsimError) -> Self {
        ErrorBody {
            code: e.code().to_string(),
            message: e.message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(
            BtsimError::BadParameter(BadParameter::TimeRewind).code(),
            "TIME_REWIND"
        );
        assert_eq!(
            BtsimError::TradeRejected(TradeRejected::VolumeNotEnough).code(),
            "VOLUME_NOT_ENOUGH"
        );
    }

    #[test]
    fn error_body_round_trips_through_json() {
        let err = BtsimError::TradeRejected(TradeRejected::CashShortage);
        let body = ErrorBody::from(&err);
        let json = serde_json::to_string(&body).unwrap();
        let back: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, "CASH_SHORTAGE");
    }
}
