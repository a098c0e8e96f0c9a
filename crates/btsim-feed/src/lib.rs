//! Feed Adapter boundary.
//!
//! This crate defines **only** the market-data contract the rest of the
//! simulator consumes: minute bars, daily price limits, daily closes,
//! dividend/split events, adjustment factors, and the trading-day calendar.
//! No live provider (HTTP, websocket, database) is implemented here — the
//! real transport is an external collaborator. [`MemoryFeed`]
//! is the deterministic reference implementation used by tests and by the
//! daemon's default wiring.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use btsim_schemas::micros::FACTOR_UNITY_MICROS;

pub mod memory;
pub use memory::MemoryFeed;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV minute bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub symbol: String,
    pub minute: NaiveDateTime,
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
}

/// Regulated daily upper/lower price bound (涨跌停).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLimits {
    pub upper_micros: i64,
    pub lower_micros: i64,
}

/// A dividend/split event effective on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DividendEvent {
    pub date: NaiveDate,
    /// Cash dividend per share, in micros.
    pub cash_per_share_micros: i64,
    /// Stock dividend ratio (shares added per share held), in micros.
    pub share_ratio_micros: i64,
    /// Rights-issue ratio (additional shares per share held), in micros.
    pub new_share_ratio_micros: i64,
}

/// Errors a [`Feed`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed did not respond within its configured timeout.
    Timeout,
    /// The feed has no data for the requested symbol/range.
    DataMissing(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Timeout => write!(f, "feed timed out"),
            FeedError::DataMissing(detail) => write!(f, "feed data missing: {detail}"),
        }
    }
}

impl std::error::Error for FeedError {}

// ---------------------------------------------------------------------------
// Feed trait
// ---------------------------------------------------------------------------

/// Upstream market-data contract, including the trading-day calendar.
///
/// Implementations must be object-safe and `Send + Sync` so the Account
/// aggregate can hold a `Arc<dyn Feed>` across `.await` suspension points.
pub trait Feed: Send + Sync {
    /// Human-readable name identifying this feed (e.g. `"memory"`).
    fn name(&self) -> &'static str;

    /// Minute bars for `symbol` from `start` (inclusive) forward, optionally
    /// bounded by `end` (inclusive). Returned in feed order; callers must
    /// not re-sort them.
    fn bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, FeedError>;

    /// Regulated price bounds for `symbol` on `date`, if the symbol traded
    /// that day.
    fn price_limits(&self, symbol: &str, date: NaiveDate) -> Result<Option<PriceLimits>, FeedError>;

    /// Daily closing price for `symbol` on `date`. `None` means the symbol
    /// did not trade that day (suspended or not yet listed).
    fn close(&self, symbol: &str, date: NaiveDate) -> Result<Option<i64>, FeedError>;

    /// Dividend/split events for `symbol` effective within
    /// `[start, end]` (inclusive both ends).
    ///
    /// Default: no corporate actions.
    fn dividends(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DividendEvent>, FeedError> {
        let _ = (symbol, start, end);
        Ok(Vec::new())
    }

    /// Cumulative adjustment factor for `symbol` effective as of `date`.
    ///
    /// Default: unity (no corporate action has ever applied).
    fn adjust_factor(&self, symbol: &str, date: NaiveDate) -> Result<i64, FeedError> {
        let _ = (symbol, date);
        Ok(FACTOR_UNITY_MICROS)
    }

    /// Whether `date` is a trading day on this feed's calendar.
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    /// All trading days in `[start, end]` (inclusive both ends), in
    /// ascending order.
    fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// The trading day `n` sessions before `date` (inclusive of neither
    /// endpoint's non-trading days). If fewer than `n` trading days precede
    /// `date` on this calendar, returns the earliest known trading day.
    fn trading_days_back(&self, date: NaiveDate, n: u32) -> NaiveDate;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_error_display() {
        assert_eq!(FeedError::Timeout.to_string(), "feed timed out");
        assert_eq!(
            FeedError::DataMissing("AAPL".to_string()).to_string(),
            "feed data missing: AAPL"
        );
    }
}
