//! Deterministic in-memory [`Feed`] implementation.
//!
//! Used by tests and as the default feed wired into `btsim-daemon` when no
//! external market-data provider is configured. All data is supplied
//! up-front by [`MemoryFeed::builder`]; no network or file IO happens here.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{Bar, DividendEvent, Feed, FeedError, PriceLimits};
use btsim_schemas::micros::FACTOR_UNITY_MICROS;

#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    trading_days: Vec<NaiveDate>,
    bars: BTreeMap<String, Vec<Bar>>,
    limits: BTreeMap<(String, NaiveDate), PriceLimits>,
    closes: BTreeMap<(String, NaiveDate), i64>,
    dividends: BTreeMap<String, Vec<DividendEvent>>,
    /// Adjustment factor effective as of a given date; looked up as the
    /// latest entry `<= date`.
    factors: BTreeMap<(String, NaiveDate), i64>,
}

impl MemoryFeed {
    pub fn builder() -> MemoryFeedBuilder {
        MemoryFeedBuilder::default()
    }
}

impl Feed for MemoryFeed {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, FeedError> {
        let Some(all) = self.bars.get(symbol) else {
            return Ok(Vec::new());
        };
        Ok(all
            .iter()
            .filter(|b| b.minute >= start && end.map_or(true, |e| b.minute <= e))
            .cloned()
            .collect())
    }

    fn price_limits(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<PriceLimits>, FeedError> {
        Ok(self.limits.get(&(symbol.to_string(), date)).copied())
    }

    fn close(&self, symbol: &str, date: NaiveDate) -> Result<Option<i64>, FeedError> {
        Ok(self.closes.get(&(symbol.to_string(), date)).copied())
    }

    fn dividends(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DividendEvent>, FeedError> {
        let Some(events) = self.dividends.get(symbol) else {
            return Ok(Vec::new());
        };
        Ok(events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .copied()
            .collect())
    }

    fn adjust_factor(&self, symbol: &str, date: NaiveDate) -> Result<i64, FeedError> {
        Ok(self
            .factors
            .range((symbol.to_string(), NaiveDate::MIN)..=(symbol.to_string(), date))
            .next_back()
            .map(|(_, factor)| *factor)
            .unwrap_or(FACTOR_UNITY_MICROS))
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.trading_days.binary_search(&date).is_ok()
    }

    fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.trading_days
            .iter()
            .filter(|d| **d >= start && **d <= end)
            .copied()
            .collect()
    }

    fn trading_days_back(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let idx = match self.trading_days.binary_search(&date) {
            Ok(i) => i,
            Err(i) => i,
        };
        let back = idx.saturating_sub(n as usize);
        self.trading_days
            .get(back)
            .copied()
            .unwrap_or_else(|| self.trading_days.first().copied().unwrap_or(date))
    }
}

/// Builder for seeding a [`MemoryFeed`] deterministically in tests.
#[derive(Debug, Default)]
pub struct MemoryFeedBuilder {
    feed: MemoryFeed,
}

impl MemoryFeedBuilder {
    pub fn trading_days(mut self, mut days: Vec<NaiveDate>) -> Self {
        days.sort();
        days.dedup();
        self.feed.trading_days = days;
        self
    }

    pub fn bar(mut self, bar: Bar) -> Self {
        self.feed
            .bars
            .entry(bar.symbol.clone())
            .or_default()
            .push(bar);
        self
    }

    pub fn bars(mut self, bars: Vec<Bar>) -> Self {
        for bar in bars {
            self = self.bar(bar);
        }
        self
    }

    pub fn price_limits(mut self, symbol: &str, date: NaiveDate, limits: PriceLimits) -> Self {
        self.feed.limits.insert((symbol.to_string(), date), limits);
        self
    }

    pub fn close(mut self, symbol: &str, date: NaiveDate, close_micros: i64) -> Self {
        self.feed
            .closes
            .insert((symbol.to_string(), date), close_micros);
        self
    }

    pub fn dividend(mut self, symbol: &str, event: DividendEvent) -> Self {
        self.feed
            .dividends
            .entry(symbol.to_string())
            .or_default()
            .push(event);
        self
    }

    pub fn adjust_factor(mut self, symbol: &str, date: NaiveDate, factor_micros: i64) -> Self {
        self.feed
            .factors
            .insert((symbol.to_string(), date), factor_micros);
        self
    }

    pub fn build(mut self) -> MemoryFeed {
        for bars in self.feed.bars.values_mut() {
            bars.sort_by_key(|b| b.minute);
        }
        self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn dt(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        NaiveDateTime::new(date, NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    #[test]
    fn bars_filtered_and_sorted_by_symbol() {
        let d = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        let feed = MemoryFeed::builder()
            .bar(Bar {
                symbol: "000001".to_string(),
                minute: dt(d, 9, 41),
                open_micros: 10_000_000,
                high_micros: 10_000_000,
                low_micros: 9_800_000,
                close_micros: 9_800_000,
                volume: 100_000,
            })
            .bar(Bar {
                symbol: "000001".to_string(),
                minute: dt(d, 9, 40),
                open_micros: 10_000_000,
                high_micros: 10_000_000,
                low_micros: 9_900_000,
                close_micros: 9_900_000,
                volume: 50_000,
            })
            .build();

        let bars = feed.bars("000001", dt(d, 9, 40), None).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].minute, dt(d, 9, 40));
        assert_eq!(bars[1].minute, dt(d, 9, 41));
    }

    #[test]
    fn adjust_factor_defaults_to_unity_then_picks_latest_entry() {
        let d1 = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2022, 3, 10).unwrap();
        let feed = MemoryFeed::builder()
            .adjust_factor("000001", d2, 2_000_000)
            .build();

        assert_eq!(feed.adjust_factor("000001", d1).unwrap(), FACTOR_UNITY_MICROS);
        assert_eq!(feed.adjust_factor("000001", d2).unwrap(), 2_000_000);
        assert_eq!(
            feed.adjust_factor("000001", d2.succ_opt().unwrap()).unwrap(),
            2_000_000
        );
    }

    #[test]
    fn trading_days_back_saturates_at_start() {
        let days: Vec<NaiveDate> = (1..=5)
            .map(|d| NaiveDate::from_ymd_opt(2022, 3, d).unwrap())
            .collect();
        let feed = MemoryFeed::builder().trading_days(days.clone()).build();

        assert_eq!(feed.trading_days_back(days[4], 2), days[2]);
        assert_eq!(feed.trading_days_back(days[1], 10), days[0]);
    }

    #[test]
    fn dividends_filtered_by_range() {
        let d1 = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2022, 3, 10).unwrap();
        let feed = MemoryFeed::builder()
            .dividend(
                "000001",
                DividendEvent {
                    date: d2,
                    cash_per_share_micros: 0,
                    share_ratio_micros: 1_000_000,
                    new_share_ratio_micros: 0,
                },
            )
            .build();

        assert!(feed.dividends("000001", d1, d1).unwrap().is_empty());
        assert_eq!(feed.dividends("000001", d1, d2).unwrap().len(), 1);
    }
}
