//! Corporate-Action Engine: walks an account's held lots
//! forward between the last-processed date and an incoming order's date,
//! emitting synthetic XDXR trades for any cash/stock dividends encountered.
//!
//! This engine applies value rather than halting — cash dividends credit
//! cash; the stock-dividend/split component of an event never mutates a
//! lot's share count. Raw shares reflect unadjusted reality and the
//! adjustment factor alone carries the split/dividend arithmetic at
//! valuation and sell time (spec's continuity requirement: value
//! immediately before and after an XDXR event must be equal). The synthetic
//! trade's `share_delta_micros` is bookkeeping only.

use chrono::NaiveDate;

use btsim_feed::Feed;
use btsim_ledger::Ledger;
use btsim_schemas::micros::{clamp_i128_to_i64, mul_micros};

mod error;
pub use error::CorpActionError;

/// One synthetic XDXR event emitted by [`advance`]. The caller (`btsim-account`)
/// turns this into a `Trade` with `side = Xdxr` and `fee_micros = 0` — these
/// events never carry a commission charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdxrEvent {
    pub symbol: String,
    pub date: NaiveDate,
    /// Cash credited to the account for this symbol's held shares.
    pub cash_delta_micros: i64,
    /// Bookkeeping-only share count implied by the event's ratio; never
    /// applied to a lot (raw share counts are not mutated by XDXR).
    pub share_delta_micros: i64,
}

/// Walks forward from `cursor` (exclusive) through `through` (inclusive),
/// crediting `ledger`'s account cash for every cash dividend on a symbol
/// held as of `cursor`, and returns the resulting synthetic events. Share
/// counts are never touched by this walk — only the account's cash (applied
/// by the caller from the returned events) and the `XdxrEvent` record.
///
/// The held-symbol set is snapshotted once on entry: nothing else mutates
/// the ledger during this walk (no other order runs inside the gap a single
/// incoming order closes), so the set of symbols held cannot change
/// mid-walk.
pub fn advance(
    feed: &dyn Feed,
    ledger: &mut Ledger,
    cursor: NaiveDate,
    through: NaiveDate,
) -> Result<(NaiveDate, Vec<XdxrEvent>), CorpActionError> {
    if through < cursor {
        return Err(CorpActionError::CursorAheadOfTarget { cursor, through });
    }
    if through == cursor {
        return Ok((cursor, Vec::new()));
    }

    let symbols: Vec<String> = ledger.symbols_held().map(|s| s.to_string()).collect();
    let walk_start = cursor.succ_opt().unwrap_or(cursor);
    let days = feed.trading_days_between(walk_start, through);

    let mut events = Vec::new();
    for day in days {
        for symbol in &symbols {
            let held_micros = ledger.shares_micros(symbol);
            if held_micros <= 0 {
                continue;
            }

            let dividends = feed
                .dividends(symbol, day, day)
                .map_err(|e| CorpActionError::Feed(e.to_string()))?;
            let Some(div) = dividends.into_iter().next() else {
                continue;
            };

            let cash_delta_micros =
                clamp_i128_to_i64(mul_micros(held_micros, div.cash_per_share_micros));
            let ratio_micros = div.share_ratio_micros + div.new_share_ratio_micros;
            // Bookkeeping only: the ratio's value is already reflected in
            // `feed.adjust_factor` from this date forward, so no lot is
            // created or resized for it.
            let share_delta_micros = clamp_i128_to_i64(mul_micros(held_micros, ratio_micros));

            events.push(XdxrEvent {
                symbol: symbol.clone(),
                date: day,
                cash_delta_micros,
                share_delta_micros,
            });
        }
    }

    Ok((through, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use btsim_feed::{DividendEvent, MemoryFeed};
    use btsim_schemas::micros::MICROS_SCALE;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn no_trading_days_in_range_emits_nothing() {
        let feed = MemoryFeed::builder()
            .trading_days(vec![d(2022, 3, 1), d(2022, 3, 2)])
            .build();
        let mut ledger = Ledger::new();
        ledger
            .apply_buy_fill(
                "000001",
                1_000 * MICROS_SCALE,
                10 * MICROS_SCALE,
                0,
                d(2022, 3, 1),
                MICROS_SCALE,
            )
            .unwrap();

        let (cursor, events) = advance(&feed, &mut ledger, d(2022, 3, 1), d(2022, 3, 1)).unwrap();
        assert_eq!(cursor, d(2022, 3, 1));
        assert!(events.is_empty());
    }

    #[test]
    fn cash_dividend_credits_cash_delta() {
        let d1 = d(2022, 3, 1);
        let d2 = d(2022, 3, 2);
        let feed = MemoryFeed::builder()
            .trading_days(vec![d1, d2])
            .dividend(
                "000001",
                DividendEvent {
                    date: d2,
                    cash_per_share_micros: 500_000, // 0.50/share
                    share_ratio_micros: 0,
                    new_share_ratio_micros: 0,
                },
            )
            .build();

        let mut ledger = Ledger::new();
        ledger
            .apply_buy_fill(
                "000001",
                1_000 * MICROS_SCALE,
                10 * MICROS_SCALE,
                0,
                d1,
                MICROS_SCALE,
            )
            .unwrap();

        let (cursor, events) = advance(&feed, &mut ledger, d1, d2).unwrap();
        assert_eq!(cursor, d2);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cash_delta_micros, 500 * MICROS_SCALE);
        assert_eq!(events[0].share_delta_micros, 0);
        // raw share count is unmutated by a pure-cash dividend.
        assert_eq!(ledger.shares_micros("000001"), 1_000 * MICROS_SCALE);
    }

    #[test]
    fn split_preserves_value_continuity() {
        let d1 = d(2022, 3, 1);
        let d2 = d(2022, 3, 2);
        let feed = MemoryFeed::builder()
            .trading_days(vec![d1, d2])
            .dividend(
                "000001",
                DividendEvent {
                    date: d2,
                    cash_per_share_micros: 0,
                    share_ratio_micros: MICROS_SCALE, // 1-for-1 split
                    new_share_ratio_micros: 0,
                },
            )
            .adjust_factor("000001", d2, 2 * MICROS_SCALE)
            .build();

        let mut ledger = Ledger::new();
        ledger
            .apply_buy_fill(
                "000001",
                1_000 * MICROS_SCALE,
                10 * MICROS_SCALE,
                0,
                d1,
                MICROS_SCALE,
            )
            .unwrap();

        let before = ledger.market_value_micros("000001", 10 * MICROS_SCALE, MICROS_SCALE);

        let (_, events) = advance(&feed, &mut ledger, d1, d2).unwrap();
        // share_delta_micros is bookkeeping only; the lot's raw shares are untouched.
        assert_eq!(events[0].share_delta_micros, 1_000 * MICROS_SCALE);
        assert_eq!(ledger.shares_micros("000001"), 1_000 * MICROS_SCALE);

        let after = ledger.market_value_micros("000001", 5 * MICROS_SCALE, 2 * MICROS_SCALE);
        assert_eq!(before, after);
    }

    #[test]
    fn cursor_ahead_of_target_is_rejected() {
        let feed = MemoryFeed::builder().build();
        let mut ledger = Ledger::new();
        let err = advance(&feed, &mut ledger, d(2022, 3, 5), d(2022, 3, 1)).unwrap_err();
        assert!(matches!(err, CorpActionError::CursorAheadOfTarget { .. }));
    }
}
