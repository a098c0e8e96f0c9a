//! Metrics Calculator: pure functions over a daily equity
//! series producing Sharpe, Sortino, Calmar, max drawdown, win rate, total
//! and annualized return, with an optional benchmark comparison.
//!
//! These formulas need a mean/standard-deviation/square-root over a return
//! series, which has no exact fixed-point representation — intermediate math
//! here uses `f64` (the only place in the `btsim-*` workspace that does),
//! and the final ratios are rescaled back to `i64` micros at the boundary so
//! every other crate keeps dealing in exact fixed-point money.

use chrono::NaiveDate;

use btsim_schemas::micros::MICROS_SCALE;
use btsim_schemas::{MetricsReport, Side, Trade};

/// Trading days per year used to annualize daily statistics.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn to_micros(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    let scaled = x * MICROS_SCALE as f64;
    if scaled > i64::MAX as f64 {
        i64::MAX
    } else if scaled < i64::MIN as f64 {
        i64::MIN
    } else {
        scaled.round() as i64
    }
}

fn from_micros(x: i64) -> f64 {
    x as f64 / MICROS_SCALE as f64
}

/// One equity-curve input: an ascending-by-date series of total-asset values
/// and the principal used to normalize returns, plus a daily risk-free rate.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub principal_micros: i64,
    pub assets: &'a [(NaiveDate, i64)],
    pub risk_free_daily_micros: i64,
}

/// Daily simple returns `r[d] = A[d]/A[d-1] - 1` as plain `f64`, the
/// intermediate representation every ratio below is built from.
fn daily_returns(assets: &[(NaiveDate, i64)]) -> Vec<f64> {
    let mut out = Vec::new();
    for pair in assets.windows(2) {
        let prev = from_micros(pair[0].1);
        let curr = from_micros(pair[1].1);
        if prev > 0.0 {
            out.push(curr / prev - 1.0);
        }
    }
    out
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// `total_return = A[end]/principal - 1`.
pub fn total_return_micros(principal_micros: i64, final_value_micros: i64) -> i64 {
    if principal_micros <= 0 {
        return 0;
    }
    to_micros(from_micros(final_value_micros) / from_micros(principal_micros) - 1.0)
}

/// `annualized = (1 + total_return)^(252/N) - 1`, `N` the number of daily
/// observations in the series (not calendar days).
pub fn annualized_return_micros(total_return_micros: i64, observation_days: usize) -> i64 {
    if observation_days == 0 {
        return 0;
    }
    let total_return = from_micros(total_return_micros);
    let exponent = TRADING_DAYS_PER_YEAR / observation_days as f64;
    to_micros((1.0 + total_return).powf(exponent) - 1.0)
}

/// `sharpe = mean(r - rf) / std(r) * sqrt(252)`.
pub fn sharpe_micros(assets: &[(NaiveDate, i64)], risk_free_daily_micros: i64) -> i64 {
    let returns = daily_returns(assets);
    if returns.is_empty() {
        return 0;
    }
    let rf = from_micros(risk_free_daily_micros);
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let sigma = std_dev(&returns);
    if sigma == 0.0 {
        return 0;
    }
    to_micros(mean(&excess) / sigma * TRADING_DAYS_PER_YEAR.sqrt())
}

/// `sortino = mean(r - rf) / std(r[r<0]) * sqrt(252)`.
pub fn sortino_micros(assets: &[(NaiveDate, i64)], risk_free_daily_micros: i64) -> i64 {
    let returns = daily_returns(assets);
    if returns.is_empty() {
        return 0;
    }
    let rf = from_micros(risk_free_daily_micros);
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sigma = std_dev(&downside);
    if sigma == 0.0 {
        return 0;
    }
    to_micros(mean(&excess) / sigma * TRADING_DAYS_PER_YEAR.sqrt())
}

/// `max_drawdown = min_d (A[d] / max_{d' <= d} A[d']) - 1`, always `<= 0`.
pub fn max_drawdown_micros(assets: &[(NaiveDate, i64)]) -> i64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for (_, value) in assets {
        let v = from_micros(*value);
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let drawdown = v / peak - 1.0;
            if drawdown < worst {
                worst = drawdown;
            }
        }
    }
    to_micros(worst)
}

/// `calmar = annualized / |max_drawdown|`. `0` when there has been no
/// drawdown (avoids a division by zero).
pub fn calmar_micros(annualized_return_micros: i64, max_drawdown_micros: i64) -> i64 {
    if max_drawdown_micros == 0 {
        return 0;
    }
    to_micros(from_micros(annualized_return_micros) / from_micros(max_drawdown_micros).abs())
}

/// `win_rate = (# sells with positive eventual_profit) / (# sells)`.
pub fn win_rate_micros(trades: &[Trade]) -> i64 {
    let sells: Vec<&Trade> = trades.iter().filter(|t| t.side.is_sell()).collect();
    if sells.is_empty() {
        return 0;
    }
    let wins = sells
        .iter()
        .filter(|t| t.eventual_profit_micros.unwrap_or(0) > 0)
        .count();
    to_micros(wins as f64 / sells.len() as f64)
}

/// Full metrics report for one equity series plus its trade log, matching
/// `NO_TRADES_YET allowed (returns zeros)` rule: an empty
/// `assets` series produces a report of all zeros rather than an error.
pub fn calculate(input: &SeriesInput, trades: &[Trade]) -> MetricsReport {
    if input.assets.is_empty() {
        return MetricsReport {
            total_return_micros: 0,
            annualized_return_micros: 0,
            sharpe_micros: 0,
            sortino_micros: 0,
            max_drawdown_micros: 0,
            calmar_micros: 0,
            win_rate_micros: 0,
            benchmark: None,
        };
    }

    let final_value = input.assets.last().map(|(_, v)| *v).unwrap_or(0);
    let total_return = total_return_micros(input.principal_micros, final_value);
    let annualized = annualized_return_micros(total_return, input.assets.len());
    let max_dd = max_drawdown_micros(input.assets);

    MetricsReport {
        total_return_micros: total_return,
        annualized_return_micros: annualized,
        sharpe_micros: sharpe_micros(input.assets, input.risk_free_daily_micros),
        sortino_micros: sortino_micros(input.assets, input.risk_free_daily_micros),
        max_drawdown_micros: max_dd,
        calmar_micros: calmar_micros(annualized, max_dd),
        win_rate_micros: win_rate_micros(trades),
        benchmark: None,
    }
}

/// Builds a notional buy-and-hold equity series for a benchmark symbol,
/// normalized so its first observation equals `principal_micros` — the same
/// starting capital as the account being compared against — then runs
/// [`calculate`] over it with an empty trade log (a benchmark has no sells
/// to compute a win rate from).
pub fn calculate_benchmark(
    principal_micros: i64,
    closes: &[(NaiveDate, i64)],
    risk_free_daily_micros: i64,
) -> Option<MetricsReport> {
    let first_close = closes.first()?.1;
    if first_close <= 0 {
        return None;
    }
    let scale = from_micros(principal_micros) / from_micros(first_close);
    let normalized: Vec<(NaiveDate, i64)> = closes
        .iter()
        .map(|(d, close)| (*d, to_micros(from_micros(*close) * scale)))
        .collect();
    let input = SeriesInput {
        principal_micros,
        assets: &normalized,
        risk_free_daily_micros,
    };
    Some(calculate(&input, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series() -> Vec<(NaiveDate, i64)> {
        vec![
            (d(2022, 1, 1), 1_000_000 * MICROS_SCALE),
            (d(2022, 1, 2), 1_010_000 * MICROS_SCALE),
            (d(2022, 1, 3), 1_005_000 * MICROS_SCALE),
            (d(2022, 1, 4), 1_030_000 * MICROS_SCALE),
        ]
    }

    fn sell_trade(profit_micros: i64) -> Trade {
        Trade {
            trade_id: "t".to_string(),
            order_id: "o".to_string(),
            symbol: "000001".to_string(),
            side: Side::Sell,
            shares_micros: 100 * MICROS_SCALE,
            price_micros: 10 * MICROS_SCALE,
            fee_micros: 0,
            trade_time: chrono::NaiveDateTime::new(
                d(2022, 1, 3),
                chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            ),
            eventual_profit_micros: Some(profit_micros),
            seq_no: 0,
        }
    }

    #[test]
    fn no_trades_yet_returns_zeros() {
        let input = SeriesInput {
            principal_micros: 1_000_000 * MICROS_SCALE,
            assets: &[],
            risk_free_daily_micros: 0,
        };
        let report = calculate(&input, &[]);
        assert_eq!(report.total_return_micros, 0);
        assert_eq!(report.sharpe_micros, 0);
    }

    #[test]
    fn total_return_matches_principal_growth() {
        let assets = series();
        let tr = total_return_micros(1_000_000 * MICROS_SCALE, assets.last().unwrap().1);
        // 1,030,000 / 1,000,000 - 1 = 0.03
        assert!((tr - 30_000).abs() <= 5);
    }

    #[test]
    fn max_drawdown_is_non_positive() {
        let assets = series();
        let dd = max_drawdown_micros(&assets);
        assert!(dd <= 0);
    }

    #[test]
    fn win_rate_counts_only_sells() {
        let trades = vec![sell_trade(100), sell_trade(-50)];
        let wr = win_rate_micros(&trades);
        // 1 win out of 2 sells = 0.5
        assert_eq!(wr, 500_000);
    }

    #[test]
    fn win_rate_with_no_sells_is_zero() {
        let trade = Trade {
            trade_id: "t".to_string(),
            order_id: "o".to_string(),
            symbol: "000001".to_string(),
            side: Side::Buy,
            shares_micros: 100 * MICROS_SCALE,
            price_micros: 10 * MICROS_SCALE,
            fee_micros: 0,
            trade_time: chrono::NaiveDateTime::new(
                d(2022, 1, 1),
                chrono::NaiveTime::from_hms_opt(9, 40, 0).unwrap(),
            ),
            eventual_profit_micros: None,
            seq_no: 0,
        };
        assert_eq!(win_rate_micros(&[trade]), 0);
    }

    #[test]
    fn calmar_zero_when_no_drawdown() {
        assert_eq!(calmar_micros(50_000, 0), 0);
    }

    #[test]
    fn benchmark_normalizes_to_same_principal() {
        let closes = vec![
            (d(2022, 1, 1), 10 * MICROS_SCALE),
            (d(2022, 1, 2), 11 * MICROS_SCALE),
        ];
        let report = calculate_benchmark(1_000_000 * MICROS_SCALE, &closes, 0).unwrap();
        // benchmark rose 10%, so total_return should be ~0.10.
        assert!((report.total_return_micros - 100_000).abs() <= 10);
    }
}
