//! Per-account position ledger: FIFO lots per symbol, fill application,
//! corporate-action lot creation, and date-keyed valuation, all expressed
//! in micros-fixed-point and rescaled by adjustment factor as needed.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use btsim_schemas::micros::{
    clamp_i128_to_i64, divide_micros_wide, mul_micros, mul_micros_wide, DUST_SHARES_MICROS,
};
use btsim_schemas::Lot;

use crate::error::LedgerError;

/// FIFO lot queue for one symbol within one account.
#[derive(Debug, Clone, Default)]
pub struct PositionState {
    pub lots: Vec<Lot>,
}

impl PositionState {
    /// Total unadjusted shares currently held.
    pub fn shares_micros(&self) -> i64 {
        self.lots.iter().map(|l| l.shares_micros).sum()
    }

    pub fn is_flat(&self) -> bool {
        self.shares_micros() < DUST_SHARES_MICROS
    }

    /// Shares excluding lots acquired on `as_of` (T+1 rule).
    pub fn sellable_shares_micros(&self, as_of: NaiveDate) -> i64 {
        self.lots
            .iter()
            .filter(|l| l.acquired_date < as_of)
            .map(|l| l.shares_micros)
            .sum()
    }
}

/// Snapshot of one symbol's position as of a valuation date.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub symbol: String,
    pub shares_micros: i64,
    /// Weighted-average cost basis across remaining lots, in the current
    /// adjustment frame.
    pub cost_micros: i64,
    pub market_price_micros: i64,
    pub market_value_micros: i64,
    pub sellable_shares_micros: i64,
}

/// Outcome of applying a sell fill: realized profit plus the mutated state.
#[derive(Debug, Clone, Copy)]
pub struct SellOutcome {
    pub realized_profit_micros: i64,
}

/// Per-account FIFO position ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    positions: BTreeMap<String, PositionState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a flat lot list, as read back from an
    /// [`crate::error::LedgerError`]-free persisted snapshot. Lots are
    /// grouped by `symbol`, preserving their stored order within each group.
    pub fn from_lots(lots: Vec<Lot>) -> Self {
        let mut positions: BTreeMap<String, PositionState> = BTreeMap::new();
        for lot in lots {
            positions.entry(lot.symbol.clone()).or_default().lots.push(lot);
        }
        Self { positions }
    }

    /// Flattens every symbol's lots back into one list, the inverse of
    /// [`Ledger::from_lots`], for writing a persisted snapshot.
    pub fn all_lots(&self) -> Vec<Lot> {
        self.positions
            .values()
            .flat_map(|p| p.lots.iter().cloned())
            .collect()
    }

    pub fn position(&self, symbol: &str) -> Option<&PositionState> {
        self.positions.get(symbol)
    }

    pub fn shares_micros(&self, symbol: &str) -> i64 {
        self.positions
            .get(symbol)
            .map(|p| p.shares_micros())
            .unwrap_or(0)
    }

    pub fn symbols_held(&self) -> impl Iterator<Item = &str> {
        self.positions
            .iter()
            .filter(|(_, p)| !p.is_flat())
            .map(|(s, _)| s.as_str())
    }

    fn validate_common(
        symbol: &str,
        shares_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<(), LedgerError> {
        if symbol.is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if shares_micros <= 0 {
            return Err(LedgerError::NonPositiveShares);
        }
        if price_micros <= 0 {
            return Err(LedgerError::NonPositivePrice);
        }
        if fee_micros < 0 {
            return Err(LedgerError::NegativeFee);
        }
        Ok(())
    }

    /// Appends a new lot for a buy fill. Decrementing cash is the caller's
    /// responsibility (cash lives on the Account, not the ledger).
    pub fn apply_buy_fill(
        &mut self,
        symbol: &str,
        shares_micros: i64,
        price_micros: i64,
        fee_micros: i64,
        acquired_date: NaiveDate,
        acquired_factor_micros: i64,
    ) -> Result<(), LedgerError> {
        Self::validate_common(symbol, shares_micros, price_micros, fee_micros)?;
        self.positions
            .entry(symbol.to_string())
            .or_default()
            .lots
            .push(Lot {
                symbol: symbol.to_string(),
                shares_micros,
                cost_basis_micros: price_micros,
                acquired_date,
                acquired_factor_micros,
            });
        Ok(())
    }

    /// Consumes FIFO lots for a sell fill, rescaling each lot's cost basis
    /// into `current_factor_micros`'s adjustment frame before computing
    /// realized profit. Crediting cash is the caller's responsibility.
    pub fn apply_sell_fill(
        &mut self,
        symbol: &str,
        shares_micros: i64,
        price_micros: i64,
        fee_micros: i64,
        current_factor_micros: i64,
    ) -> Result<SellOutcome, LedgerError> {
        Self::validate_common(symbol, shares_micros, price_micros, fee_micros)?;

        let held = self.shares_micros(symbol);
        if held < shares_micros {
            return Err(LedgerError::InsufficientShares {
                requested_micros: shares_micros,
                held_micros: held,
            });
        }

        let position = self.positions.get_mut(symbol).expect("held >= requested implies position exists");
        let mut remaining = shares_micros;
        let mut realized_micros: i128 = 0;

        for lot in position.lots.iter_mut() {
            if remaining <= 0 {
                break;
            }
            let consumed = remaining.min(lot.shares_micros);
            if consumed <= 0 {
                continue;
            }

            // effective_cost = cost_basis * acquired_factor / current_factor
            let cost_times_factor = mul_micros(lot.cost_basis_micros, lot.acquired_factor_micros);
            let effective_cost_micros =
                clamp_i128_to_i64(divide_micros_wide(cost_times_factor, current_factor_micros));

            let profit_per_share = price_micros - effective_cost_micros;
            realized_micros += mul_micros(profit_per_share, consumed);

            lot.shares_micros -= consumed;
            remaining -= consumed;
        }

        position.lots.retain(|l| l.shares_micros >= DUST_SHARES_MICROS);

        Ok(SellOutcome {
            realized_profit_micros: clamp_i128_to_i64(realized_micros),
        })
    }

    /// Market value of one symbol at a valuation date, per :
    /// `Σ lot.shares · price_D · adjust_factor(S,D) / lot.acquired_factor`.
    pub fn market_value_micros(&self, symbol: &str, price_at_date_micros: i64, factor_at_date_micros: i64) -> i64 {
        let Some(position) = self.positions.get(symbol) else {
            return 0;
        };
        let mut total: i128 = 0;
        for lot in &position.lots {
            let shares_times_price = mul_micros(lot.shares_micros, price_at_date_micros);
            let shares_price_factor = mul_micros_wide(shares_times_price, factor_at_date_micros);
            total += divide_micros_wide(shares_price_factor, lot.acquired_factor_micros);
        }
        clamp_i128_to_i64(total)
    }

    /// Weighted-average cost basis across a symbol's remaining lots, in the
    /// current adjustment frame.
    pub fn weighted_avg_cost_micros(&self, symbol: &str, current_factor_micros: i64) -> i64 {
        let Some(position) = self.positions.get(symbol) else {
            return 0;
        };
        let total_shares = position.shares_micros();
        if total_shares <= 0 {
            return 0;
        }
        let mut cost_times_shares: i128 = 0;
        for lot in &position.lots {
            let cost_times_factor = mul_micros(lot.cost_basis_micros, lot.acquired_factor_micros);
            let effective_cost =
                clamp_i128_to_i64(divide_micros_wide(cost_times_factor, current_factor_micros));
            cost_times_shares += mul_micros(effective_cost, lot.shares_micros);
        }
        clamp_i128_to_i64(divide_micros_wide(cost_times_shares, total_shares))
    }

    /// Summary snapshot for one symbol as of `as_of`, using `price_micros`
    /// and `factor_micros` already resolved by the caller (the Account owns
    /// the feed lookup and 500-day fallback rule).
    pub fn snapshot(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        price_micros: i64,
        factor_micros: i64,
    ) -> LedgerSnapshot {
        let shares = self.shares_micros(symbol);
        LedgerSnapshot {
            symbol: symbol.to_string(),
            shares_micros: shares,
            cost_micros: self.weighted_avg_cost_micros(symbol, factor_micros),
            market_price_micros: price_micros,
            market_value_micros: self.market_value_micros(symbol, price_micros, factor_micros),
            sellable_shares_micros: self
                .positions
                .get(symbol)
                .map(|p| p.sellable_shares_micros(as_of))
                .unwrap_or(0),
        }
    }
}
