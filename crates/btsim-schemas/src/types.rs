//! Wire and domain DTOs shared across the `btsim-*` crates.
//!
//! Prices, shares, and cash are always `i64` micros (see [`crate::micros`]);
//! nothing in this crate or its consumers represents them as `f64`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side, including the synthetic `Xdxr` side used for corporate-action
/// trades (never client-submitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    MarketBuy,
    MarketSell,
    SellPercent,
    Xdxr,
}

impl Side {
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy | Side::MarketBuy)
    }

    pub fn is_sell(self) -> bool {
        matches!(self, Side::Sell | Side::MarketSell | Side::SellPercent)
    }

    pub fn is_market(self) -> bool {
        matches!(self, Side::MarketBuy | Side::MarketSell | Side::SellPercent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Filled,
    Partial,
    Rejected,
}

/// An accepted order instruction. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrust {
    pub order_id: String,
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    /// Absent for market orders and XDXR.
    pub price_micros: Option<i64>,
    /// For `SellPercent` this is a fraction-of-holding in micros (e.g.
    /// `500_000` = 0.5), not a share count.
    pub shares_micros: i64,
    pub order_time: NaiveDateTime,
    pub status: OrderStatus,
    pub reason: Option<String>,
    /// Process-wide monotonic sequence number, unique across every account —
    /// gives `bills()` a stable total order beyond per-account `order_time`.
    pub seq_no: u64,
}

/// A realized fill against an [`Entrust`]. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub shares_micros: i64,
    /// Weighted-average fill price across matched bars; bookkeeping only
    /// for XDXR trades.
    pub price_micros: i64,
    pub fee_micros: i64,
    pub trade_time: NaiveDateTime,
    /// Realized profit for sells, against the consumed lots' cost basis.
    /// `None` for buys and XDXR trades.
    pub eventual_profit_micros: Option<i64>,
    /// Process-wide monotonic sequence number, shared with [`Entrust::seq_no`].
    pub seq_no: u64,
}

/// One FIFO purchase tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub symbol: String,
    /// Unadjusted share count; never mutated by an XDXR event except as an
    /// explicit new lot.
    pub shares_micros: i64,
    /// Per-share cost basis, in the adjustment frame at purchase.
    pub cost_basis_micros: i64,
    pub acquired_date: NaiveDate,
    pub acquired_factor_micros: i64,
}

/// Per-symbol position snapshot as returned by `positions`/`info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub shares_micros: i64,
    pub cost_micros: i64,
    pub market_price_micros: i64,
    pub market_value_micros: i64,
    /// Excludes shares bought today (T+1 rule).
    pub sellable_shares_micros: i64,
}

/// One row of the daily mark-to-market assets table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsRow {
    pub date: NaiveDate,
    pub cash_micros: i64,
    pub market_value_micros: i64,
    pub total_micros: i64,
}

/// Summary returned by `info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub principal_micros: i64,
    pub cash_micros: i64,
    pub commission_micros: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub xdxr_cursor: NaiveDate,
}

/// Analytics returned by `metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total_return_micros: i64,
    pub annualized_return_micros: i64,
    pub sharpe_micros: i64,
    pub sortino_micros: i64,
    pub max_drawdown_micros: i64,
    pub calmar_micros: i64,
    pub win_rate_micros: i64,
    pub benchmark: Option<Box<MetricsReport>>,
}

/// Deterministic id derivation: `Uuid::new_v5` over a namespace and a
/// caller-supplied discriminator string, never `Uuid::new_v4`.
pub fn derive_id(namespace: &str, discriminator: &str) -> String {
    let ns = Uuid::new_v5(&Uuid::NAMESPACE_OID, namespace.as_bytes());
    Uuid::new_v5(&ns, discriminator.as_bytes()).to_string()
}
