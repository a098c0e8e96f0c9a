//! `Account`: the per-account aggregate — one Position Ledger, cash,
//! commission rate, entrust/trade logs, and the daily assets table, behind
//! the strict-ordering and suspension-policy rules.
//!
//! Every mutating call runs a fixed staged pipeline: XDXR forward-fill ->
//! match -> ledger apply -> entrust/trade append -> assets-table rewrite.

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use btsim_corpaction::advance as advance_xdxr;
use btsim_feed::Feed;
use btsim_ledger::Ledger;
use btsim_matcher::{match_order, is_valid_buy_lot_size, sell_percent_shares_micros, MatchOutcome, MatchRequest};
use btsim_metrics::{calculate, calculate_benchmark, SeriesInput};
use btsim_schemas::micros::{clamp_i128_to_i64, mul_micros};
use btsim_schemas::{
    derive_id, AccountError, AccountInfo, AssetsRow, BadParameter, BtsimError, Entrust, Infra,
    MetricsReport, OrderStatus, PositionSnapshot, Side, Trade, TradeRejected,
};

use crate::seq::next_seq_no;

/// Lookback window for the suspended-symbol valuation fallback.
const SUSPENDED_LOOKBACK_TRADING_DAYS: u32 = 500;

/// An account's resolved configuration, supplied at `start_backtest` time
/// and otherwise immutable for the session.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub name: String,
    pub token: String,
    pub principal_micros: i64,
    /// Flat commission rate expressed in micros (e.g. `100` = 1e-4).
    pub commission_rate_micros: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub feed_timeout: Duration,
    /// open question, resolved as a configurable toggle (see
    /// `DESIGN.md`'s Open Question resolutions). `false` is the narrow,
    /// post-0.4.6 default: a suspended held symbol only blocks trading of
    /// *that* symbol, not every symbol on the account.
    pub suspension_blocks_all_trading: bool,
}

/// The per-account aggregate. All mutating methods run the full XDXR ->
/// match -> ledger -> ledger-append -> assets-rewrite pipeline as one
/// logical critical section; callers (`Registry`) are responsible for
/// holding the per-account lock across the call.
#[derive(Debug)]
pub struct Account {
    pub config: AccountConfig,
    pub cash_micros: i64,
    pub xdxr_cursor: NaiveDate,
    pub ledger: Ledger,
    pub entrusts: Vec<Entrust>,
    pub trades: Vec<Trade>,
    /// One row per date, rewritten in place as later trades touch it.
    pub assets: Vec<AssetsRow>,
    stopped: bool,
}

/// Pre-forward-fill state captured at the start of `execute_order`, so a
/// reject anywhere downstream of the XDXR commit can restore it exactly.
struct ExecutionSnapshot {
    cash_micros: i64,
    xdxr_cursor: NaiveDate,
    ledger: Ledger,
    trades_len: usize,
}

async fn with_feed_timeout<T>(
    feed_timeout: Duration,
    fut: impl Future<Output = T>,
) -> Result<T, BtsimError> {
    tokio::time::timeout(feed_timeout, fut)
        .await
        .map_err(|_| BtsimError::Infra(Infra::FeedTimeout))
}

impl Account {
    pub fn new(config: AccountConfig) -> Self {
        let start_date = config.start_date;
        let principal = config.principal_micros;
        Self {
            config,
            cash_micros: principal,
            xdxr_cursor: start_date,
            ledger: Ledger::new(),
            entrusts: Vec::new(),
            trades: Vec::new(),
            assets: Vec::new(),
            stopped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn token(&self) -> &str {
        &self.config.token
    }

    /// The strict-ordering invariant (spec.md §3) is over *accepted*
    /// orders only — a rejected entrust still gets appended (so `bills()`
    /// shows the attempt) but must not make a corrected retry at the same
    /// `order_time` fail `TIME_REWIND`.
    fn last_order_time(&self) -> Option<NaiveDateTime> {
        self.entrusts
            .iter()
            .rev()
            .find(|e| e.status != OrderStatus::Rejected)
            .map(|e| e.order_time)
    }

    fn check_strict_ordering(&self, order_time: NaiveDateTime) -> Result<(), BtsimError> {
        if let Some(last) = self.last_order_time() {
            if order_time <= last {
                return Err(BtsimError::BadParameter(BadParameter::TimeRewind));
            }
        }
        Ok(())
    }

    async fn is_symbol_suspended(
        &self,
        feed: &dyn Feed,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<bool, BtsimError> {
        with_feed_timeout(self.config.feed_timeout, async {
            feed.close(symbol, date)
        })
        .await?
        .map(|c| c.is_none())
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))
    }

    async fn check_suspension_policy(
        &self,
        feed: &dyn Feed,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<(), BtsimError> {
        if self.is_symbol_suspended(feed, symbol, date).await? {
            return Err(BtsimError::TradeRejected(TradeRejected::Suspended));
        }
        if self.config.suspension_blocks_all_trading {
            for held in self.ledger.symbols_held() {
                if held == symbol {
                    continue;
                }
                if self.is_symbol_suspended(feed, held, date).await? {
                    return Err(BtsimError::TradeRejected(TradeRejected::Suspended));
                }
            }
        }
        Ok(())
    }

    /// Resolves one symbol's market value at `date`: the day's close if it
    /// traded, else the closest preceding non-suspended close within a
    /// 500-trading-day window, else the weighted-average cost basis.
    async fn position_market_value(
        &self,
        feed: &dyn Feed,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<i64, BtsimError> {
        let shares = self.ledger.shares_micros(symbol);
        if shares <= 0 {
            return Ok(0);
        }

        let direct_close = with_feed_timeout(self.config.feed_timeout, async {
            feed.close(symbol, date)
        })
        .await?
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;

        if let Some(close) = direct_close {
            let factor = with_feed_timeout(self.config.feed_timeout, async {
                feed.adjust_factor(symbol, date)
            })
            .await?
            .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
            return Ok(self.ledger.market_value_micros(symbol, close, factor));
        }

        let window_start =
            feed.trading_days_back(date, SUSPENDED_LOOKBACK_TRADING_DAYS);
        let candidates = feed.trading_days_between(window_start, date);
        for candidate in candidates.into_iter().rev() {
            if candidate >= date {
                continue;
            }
            let close = with_feed_timeout(self.config.feed_timeout, async {
                feed.close(symbol, candidate)
            })
            .await?
            .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
            if let Some(close) = close {
                let factor = with_feed_timeout(self.config.feed_timeout, async {
                    feed.adjust_factor(symbol, candidate)
                })
                .await?
                .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
                return Ok(self.ledger.market_value_micros(symbol, close, factor));
            }
        }

        let current_factor = with_feed_timeout(self.config.feed_timeout, async {
            feed.adjust_factor(symbol, date)
        })
        .await?
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
        let avg_cost = self.ledger.weighted_avg_cost_micros(symbol, current_factor);
        Ok(clamp_i128_to_i64(mul_micros(shares, avg_cost)))
    }

    async fn total_market_value(&self, feed: &dyn Feed, date: NaiveDate) -> Result<i64, BtsimError> {
        let mut total = 0i64;
        for symbol in self.ledger.symbols_held().map(|s| s.to_string()).collect::<Vec<_>>() {
            total = total.saturating_add(self.position_market_value(feed, &symbol, date).await?);
        }
        Ok(total)
    }

    fn rewrite_assets_row(&mut self, date: NaiveDate, market_value_micros: i64) {
        let total_micros = self.cash_micros.saturating_add(market_value_micros);
        if let Some(row) = self.assets.iter_mut().find(|r| r.date == date) {
            row.cash_micros = self.cash_micros;
            row.market_value_micros = market_value_micros;
            row.total_micros = total_micros;
        } else {
            self.assets.push(AssetsRow {
                date,
                cash_micros: self.cash_micros,
                market_value_micros,
                total_micros,
            });
            self.assets.sort_by_key(|r| r.date);
        }
    }

    fn commission(&self, notional_micros: i64) -> i64 {
        clamp_i128_to_i64(mul_micros(notional_micros, self.config.commission_rate_micros)).max(0)
    }

    /// Everything `execute_order` can mutate before it knows an order is
    /// fillable: the XDXR forward-fill commits cash/lots/trades/cursor
    /// irreversibly ahead of the suspension, position-short, match, and
    /// cash-shortage checks, so a reject anywhere after that point must put
    /// all four back exactly as they were (spec.md §7: a rejected order
    /// leaves the account completely unchanged).
    fn snapshot_for_rollback(&self) -> ExecutionSnapshot {
        ExecutionSnapshot {
            cash_micros: self.cash_micros,
            xdxr_cursor: self.xdxr_cursor,
            ledger: self.ledger.clone(),
            trades_len: self.trades.len(),
        }
    }

    fn rollback(&mut self, snapshot: &ExecutionSnapshot) {
        self.cash_micros = snapshot.cash_micros;
        self.xdxr_cursor = snapshot.xdxr_cursor;
        self.ledger = snapshot.ledger.clone();
        self.trades.truncate(snapshot.trades_len);
    }

    /// Shared implementation behind `buy`/`sell`/`market_buy`/`market_sell`/
    /// `sell_percent` — pipeline: strict-ordering check ->
    /// XDXR forward-fill -> suspension check -> match -> ledger apply ->
    /// entrust/trade append -> assets rewrite. A rejected order leaves the
    /// account completely unchanged: every `reject_with` call after the
    /// XDXR forward-fill rolls cash/lots/trades/cursor back to the
    /// pre-forward-fill snapshot before returning `Err`.
    async fn execute_order(
        &mut self,
        feed: &dyn Feed,
        side: Side,
        symbol: &str,
        limit_price_micros: Option<i64>,
        requested_shares_micros: i64,
        order_time: NaiveDateTime,
    ) -> Result<Entrust, BtsimError> {
        self.check_strict_ordering(order_time)?;

        if side.is_buy() && !is_valid_buy_lot_size(requested_shares_micros) {
            let snapshot = self.snapshot_for_rollback();
            return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, BadParameter::LotSize.into());
        }

        let snapshot = self.snapshot_for_rollback();

        let order_date = order_time.date();
        let (new_cursor, events) = with_feed_timeout(self.config.feed_timeout, async {
            advance_xdxr(feed, &mut self.ledger, self.xdxr_cursor, order_date)
        })
        .await?
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
        self.xdxr_cursor = new_cursor;

        for event in events {
            self.cash_micros = self.cash_micros.saturating_add(event.cash_delta_micros);
            let xdxr_order_id = derive_id(
                "xdxr",
                &format!("{}:{}:{}", self.config.token, event.symbol, event.date),
            );
            self.trades.push(Trade {
                trade_id: derive_id("trade", &format!("{xdxr_order_id}:xdxr")),
                order_id: xdxr_order_id,
                symbol: event.symbol.clone(),
                side: Side::Xdxr,
                shares_micros: event.share_delta_micros,
                price_micros: 0,
                fee_micros: 0,
                trade_time: NaiveDateTime::new(event.date, order_time.time()),
                eventual_profit_micros: None,
                seq_no: next_seq_no(),
            });
        }

        if side.is_sell() {
            if let Err(e) = self.check_suspension_policy(feed, symbol, order_date).await {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, e);
            }
        }

        let effective_shares_micros = if matches!(side, Side::SellPercent) {
            let held = self.ledger.shares_micros(symbol);
            sell_percent_shares_micros(requested_shares_micros, held)
        } else {
            requested_shares_micros
        };

        if side.is_sell() {
            let sellable = self
                .ledger
                .position(symbol)
                .map(|p| p.sellable_shares_micros(order_date))
                .unwrap_or(0);
            if effective_shares_micros > sellable {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, TradeRejected::PositionShort.into());
            }
        }

        let bars = with_feed_timeout(self.config.feed_timeout, async {
            feed.bars(symbol, order_time, None)
        })
        .await?
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;

        let req = MatchRequest {
            side,
            limit_price_micros,
            requested_shares_micros: effective_shares_micros,
            order_time,
        };
        // match_order takes a plain `Fn`, not an async closure; price_limits
        // is looked up per distinct bar date directly against `feed`.
        let limits_for = |d: NaiveDate| -> Option<btsim_feed::PriceLimits> {
            feed.price_limits(symbol, d).ok().flatten()
        };
        let outcome = match_order(&req, bars, limits_for);

        let (shares_micros, price_micros, fill_time, status) = match outcome {
            MatchOutcome::Filled { shares_micros, price_micros, fill_time } => {
                (shares_micros, price_micros, fill_time, OrderStatus::Filled)
            }
            MatchOutcome::Partial { shares_micros, price_micros, fill_time } => {
                (shares_micros, price_micros, fill_time, OrderStatus::Partial)
            }
            MatchOutcome::NoMatch => {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, TradeRejected::NoMatch.into());
            }
            MatchOutcome::PriceLimit => {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, TradeRejected::PriceLimit.into());
            }
            MatchOutcome::VolumeNotEnough => {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, TradeRejected::VolumeNotEnough.into());
            }
        };

        let notional_micros = clamp_i128_to_i64(mul_micros(shares_micros, price_micros)).max(0);
        let fee_micros = self.commission(notional_micros);

        if side.is_buy() {
            let total_cost = notional_micros.saturating_add(fee_micros);
            if total_cost > self.cash_micros {
                return self.reject_with(&snapshot, side, symbol, limit_price_micros, requested_shares_micros, order_time, TradeRejected::CashShortage.into());
            }
        }

        let acquired_factor = with_feed_timeout(self.config.feed_timeout, async {
            feed.adjust_factor(symbol, fill_time.date())
        })
        .await?
        .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;

        let eventual_profit_micros = if side.is_buy() {
            self.ledger
                .apply_buy_fill(symbol, shares_micros, price_micros, fee_micros, fill_time.date(), acquired_factor)
                .expect("validated shares/price/fee above");
            self.cash_micros -= notional_micros.saturating_add(fee_micros);
            None
        } else {
            let sell_outcome = self
                .ledger
                .apply_sell_fill(symbol, shares_micros, price_micros, fee_micros, acquired_factor)
                .expect("sellable check above guards InsufficientShares");
            self.cash_micros += notional_micros.saturating_sub(fee_micros);
            Some(sell_outcome.realized_profit_micros)
        };

        let order_id = derive_id("order", &format!("{}:{}:{}", self.config.token, symbol, order_time));
        let trade_id = derive_id("trade", &format!("{order_id}:{status:?}"));

        let entrust = Entrust {
            order_id: order_id.clone(),
            account_id: self.config.token.clone(),
            symbol: symbol.to_string(),
            side,
            price_micros: limit_price_micros,
            shares_micros: requested_shares_micros,
            order_time,
            status,
            reason: None,
            seq_no: next_seq_no(),
        };
        self.entrusts.push(entrust.clone());

        self.trades.push(Trade {
            trade_id,
            order_id,
            symbol: symbol.to_string(),
            side,
            shares_micros,
            price_micros,
            fee_micros,
            trade_time: fill_time,
            eventual_profit_micros,
            seq_no: next_seq_no(),
        });

        let market_value = self.total_market_value(feed, fill_time.date()).await?;
        self.rewrite_assets_row(fill_time.date(), market_value);

        Ok(entrust)
    }

    /// A rejected order is still recorded in the entrust log (with
    /// `status = Rejected` and a `reason`) so `bills()` shows the attempt,
    /// but first rolls cash/lots/trades/cursor back to `snapshot` so
    /// nothing else on the account changes — no cash, lot, XDXR-cursor, or
    /// assets mutation survives this path.
    fn reject_with(
        &mut self,
        snapshot: &ExecutionSnapshot,
        side: Side,
        symbol: &str,
        price_micros: Option<i64>,
        shares_micros: i64,
        order_time: NaiveDateTime,
        err: BtsimError,
    ) -> Result<Entrust, BtsimError> {
        self.rollback(snapshot);
        let order_id = derive_id("order", &format!("{}:{}:{}:rejected", self.config.token, symbol, order_time));
        let entrust = Entrust {
            order_id,
            account_id: self.config.token.clone(),
            symbol: symbol.to_string(),
            side,
            price_micros,
            shares_micros,
            order_time,
            status: OrderStatus::Rejected,
            reason: Some(err.code().to_string()),
            seq_no: next_seq_no(),
        };
        self.entrusts.push(entrust);
        Err(err)
    }

    pub async fn buy(&mut self, feed: &dyn Feed, symbol: &str, price_micros: i64, shares_micros: i64, order_time: NaiveDateTime) -> Result<Entrust, BtsimError> {
        self.execute_order(feed, Side::Buy, symbol, Some(price_micros), shares_micros, order_time).await
    }

    pub async fn market_buy(&mut self, feed: &dyn Feed, symbol: &str, shares_micros: i64, order_time: NaiveDateTime) -> Result<Entrust, BtsimError> {
        self.execute_order(feed, Side::MarketBuy, symbol, None, shares_micros, order_time).await
    }

    pub async fn sell(&mut self, feed: &dyn Feed, symbol: &str, price_micros: i64, shares_micros: i64, order_time: NaiveDateTime) -> Result<Entrust, BtsimError> {
        self.execute_order(feed, Side::Sell, symbol, Some(price_micros), shares_micros, order_time).await
    }

    pub async fn market_sell(&mut self, feed: &dyn Feed, symbol: &str, shares_micros: i64, order_time: NaiveDateTime) -> Result<Entrust, BtsimError> {
        self.execute_order(feed, Side::MarketSell, symbol, None, shares_micros, order_time).await
    }

    pub async fn sell_percent(&mut self, feed: &dyn Feed, symbol: &str, fraction_micros: i64, order_time: NaiveDateTime) -> Result<Entrust, BtsimError> {
        self.execute_order(feed, Side::SellPercent, symbol, None, fraction_micros, order_time).await
    }

    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            name: self.config.name.clone(),
            principal_micros: self.config.principal_micros,
            cash_micros: self.cash_micros,
            commission_micros: self.config.commission_rate_micros,
            start_date: self.config.start_date,
            end_date: self.config.end_date,
            xdxr_cursor: self.xdxr_cursor,
        }
    }

    pub async fn positions(&self, feed: &dyn Feed, as_of: NaiveDate) -> Result<Vec<PositionSnapshot>, BtsimError> {
        let mut out = Vec::new();
        for symbol in self.ledger.symbols_held().map(|s| s.to_string()).collect::<Vec<_>>() {
            let close = with_feed_timeout(self.config.feed_timeout, async { feed.close(&symbol, as_of) })
                .await?
                .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
            let factor = with_feed_timeout(self.config.feed_timeout, async { feed.adjust_factor(&symbol, as_of) })
                .await?
                .map_err(|_| BtsimError::Infra(Infra::FeedDataMissing))?;
            let market_price = close.unwrap_or(0);
            let snap = self.ledger.snapshot(&symbol, as_of, market_price, factor);
            out.push(PositionSnapshot {
                symbol: snap.symbol,
                shares_micros: snap.shares_micros,
                cost_micros: snap.cost_micros,
                market_price_micros: snap.market_price_micros,
                market_value_micros: snap.market_value_micros,
                sellable_shares_micros: snap.sellable_shares_micros,
            });
        }
        Ok(out)
    }

    pub fn bills(&self) -> Vec<(Entrust, Vec<Trade>)> {
        self.entrusts
            .iter()
            .map(|e| {
                let trades = self
                    .trades
                    .iter()
                    .filter(|t| t.order_id == e.order_id)
                    .cloned()
                    .collect();
                (e.clone(), trades)
            })
            .collect()
    }

    pub fn get_assets(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<AssetsRow> {
        self.assets
            .iter()
            .filter(|r| from.map_or(true, |f| r.date >= f))
            .filter(|r| to.map_or(true, |t| r.date <= t))
            .cloned()
            .collect()
    }

    /// Forward-fills the assets table through `end_date` without trading,
    /// amortizing the per-day revaluation work away from `metrics()`.
    pub async fn stop(&mut self, feed: &dyn Feed) -> Result<(), BtsimError> {
        let last_touched = self.assets.last().map(|r| r.date).unwrap_or(self.config.start_date);
        let days = feed.trading_days_between(last_touched, self.config.end_date);
        for day in days {
            if self.assets.iter().any(|r| r.date == day) {
                continue;
            }
            let market_value = self.total_market_value(feed, day).await?;
            self.rewrite_assets_row(day, market_value);
        }
        self.stopped = true;
        tracing::info!(
            account = %self.config.name,
            equity_micros = self.assets.last().map(|r| r.total_micros).unwrap_or(self.cash_micros),
            "account stopped"
        );
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn metrics(&self, benchmark_closes: Option<&[(NaiveDate, i64)]>, risk_free_daily_micros: i64) -> MetricsReport {
        let assets: Vec<(NaiveDate, i64)> = self.assets.iter().map(|r| (r.date, r.total_micros)).collect();
        let input = SeriesInput {
            principal_micros: self.config.principal_micros,
            assets: &assets,
            risk_free_daily_micros,
        };
        let mut report = calculate(&input, &self.trades);
        if let Some(closes) = benchmark_closes {
            report.benchmark = calculate_benchmark(self.config.principal_micros, closes, risk_free_daily_micros).map(Box::new);
        }
        report
    }
}

impl From<BadParameter> for BtsimError {
    fn from(e: BadParameter) -> Self {
        BtsimError::BadParameter(e)
    }
}

impl From<TradeRejected> for BtsimError {
    fn from(e: TradeRejected) -> Self {
        BtsimError::TradeRejected(e)
    }
}

impl From<AccountError> for BtsimError {
    fn from(e: AccountError) -> Self {
        BtsimError::AccountError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btsim_feed::{Bar, DividendEvent, MemoryFeed};
    use btsim_schemas::micros::MICROS_SCALE;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dt(date: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        NaiveDateTime::new(date, NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    fn bar(date: NaiveDate, h: u32, min: u32, open: i64, close: i64, volume: i64) -> Bar {
        Bar {
            symbol: "000001".to_string(),
            minute: dt(date, h, min),
            open_micros: open * MICROS_SCALE,
            high_micros: open.max(close) * MICROS_SCALE,
            low_micros: open.min(close) * MICROS_SCALE,
            close_micros: close * MICROS_SCALE,
            volume,
        }
    }

    fn config(start: NaiveDate, end: NaiveDate) -> AccountConfig {
        AccountConfig {
            name: "acct".to_string(),
            token: "tok".to_string(),
            principal_micros: 2_000 * MICROS_SCALE,
            commission_rate_micros: 100, // 1e-4
            start_date: start,
            end_date: end,
            feed_timeout: Duration::from_secs(5),
            suspension_blocks_all_trading: false,
        }
    }

    /// Covers the all-or-nothing review fix: an XDXR forward-fill that
    /// credits cash ahead of an order that is itself rejected must leave
    /// cash, lots, the XDXR cursor and the trade log exactly as they were —
    /// only the rejected entrust gets appended.
    #[tokio::test]
    async fn rejected_order_rolls_back_xdxr_forward_fill() {
        let d1 = d(2022, 3, 1);
        let d2 = d(2022, 3, 2);
        let d3 = d(2022, 3, 3);
        let feed = MemoryFeed::builder()
            .trading_days(vec![d1, d2, d3])
            .bar(bar(d1, 9, 40, 10, 10, 100_000))
            .dividend(
                "000001",
                DividendEvent {
                    date: d2,
                    cash_per_share_micros: 500_000, // 0.50/share
                    share_ratio_micros: 0,
                    new_share_ratio_micros: 0,
                },
            )
            .bar(bar(d3, 9, 40, 9, 9, 1_000_000))
            .build();

        let mut account = Account::new(config(d1, d3));

        account
            .buy(&feed, "000001", 10 * MICROS_SCALE, 100 * MICROS_SCALE, dt(d1, 9, 40))
            .await
            .unwrap();
        let cash_after_buy1 = account.cash_micros;
        let shares_after_buy1 = account.ledger.shares_micros("000001");
        assert_eq!(cash_after_buy1, 999_900_000); // 2000 - 1000 notional - 0.1 fee
        assert_eq!(account.xdxr_cursor, d1);
        assert_eq!(account.trades.len(), 1);

        // This buy crosses at d3's bar but costs far more than cash on hand,
        // even counting the d2 dividend credit the forward-fill would apply
        // (999.9 + 50 = 1049.9 < 1800.18) — CASH_SHORTAGE is unavoidable.
        let err = account
            .buy(&feed, "000001", 9 * MICROS_SCALE, 200 * MICROS_SCALE, dt(d3, 9, 40))
            .await
            .unwrap_err();
        assert!(matches!(err, BtsimError::TradeRejected(TradeRejected::CashShortage)));

        // Nothing from the XDXR walk through d3 survived the rollback.
        assert_eq!(account.cash_micros, cash_after_buy1);
        assert_eq!(account.xdxr_cursor, d1);
        assert_eq!(account.ledger.shares_micros("000001"), shares_after_buy1);
        assert_eq!(account.trades.len(), 1);
        assert_eq!(account.entrusts.len(), 2);
        assert_eq!(account.entrusts[1].status, OrderStatus::Rejected);
    }

    /// Covers the strict-ordering review fix: a rejected entrust must not
    /// poison `last_order_time` — a corrected retry at the same timestamp
    /// has to be accepted, not fail `TIME_REWIND`.
    #[tokio::test]
    async fn rejected_order_does_not_poison_strict_ordering() {
        let day = d(2022, 3, 1);
        let feed = MemoryFeed::builder()
            .trading_days(vec![day])
            .bar(bar(day, 9, 40, 10, 10, 100_000))
            .build();

        let mut account = Account::new(config(day, day));
        let order_time = dt(day, 9, 40);

        let err = account
            .buy(&feed, "000001", 10 * MICROS_SCALE, 150 * MICROS_SCALE, order_time)
            .await
            .unwrap_err();
        assert!(matches!(err, BtsimError::BadParameter(BadParameter::LotSize)));

        // Same order_time, corrected lot size: must not fail TIME_REWIND.
        let entrust = account
            .buy(&feed, "000001", 10 * MICROS_SCALE, 100 * MICROS_SCALE, order_time)
            .await
            .unwrap();
        assert_eq!(entrust.status, OrderStatus::Filled);
    }
}
