//! Matcher: stateless bar-driven fill-price computation.
//!
//! [`match_order`] never touches an account, a ledger, or cash — it only
//! turns an order plus a bar stream into a fill decision.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use btsim_feed::{Bar, PriceLimits};
use btsim_schemas::micros::{clamp_i128_to_i64, divide_micros_wide, mul_micros};
use btsim_schemas::Side;

/// 09:31 cutoff for the "next-day open" special case.
fn open_rule_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 31, 0).expect("valid constant time")
}

/// Input to one matching attempt. Stateless — carries nothing the matcher
/// itself needs to look up (that's what `bars` and `limits_for` are for).
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest {
    pub side: Side,
    /// Absent for market orders (`MarketBuy`/`MarketSell`/`SellPercent`).
    pub limit_price_micros: Option<i64>,
    pub requested_shares_micros: i64,
    pub order_time: NaiveDateTime,
}

impl MatchRequest {
    fn is_market(&self) -> bool {
        self.side.is_market()
    }

    fn is_buy(&self) -> bool {
        self.side.is_buy()
    }
}

/// Decision produced by [`match_order`]. `VOLUME_NOT_ENOUGH`, `NO_MATCH` and
/// `PRICE_LIMIT` are outcomes, not errors raised mid-computation — the
/// caller (`btsim-account`) turns a non-`Filled`/`Partial` outcome into the
/// matching wire error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Filled {
        shares_micros: i64,
        price_micros: i64,
        fill_time: NaiveDateTime,
    },
    Partial {
        shares_micros: i64,
        price_micros: i64,
        fill_time: NaiveDateTime,
    },
    /// The requested price was never crossed by any bar in the stream, and
    /// at least one bar that ran past the price filter existed (so the
    /// market just never traded at the requested price — not a one-sided
    /// limit-up/limit-down day).
    NoMatch,
    /// Every bar this call considered was discarded at step 2 as an
    /// uncrossable one-sided limit-up/limit-down bar: the stock itself
    /// never had a tradable side during the window, distinct from
    /// `NoMatch`'s "bars existed but the price wasn't met".
    PriceLimit,
    /// A bar's price matched but reported zero volume (issue #31): the
    /// order is rejected entirely rather than producing a partial fill that
    /// silently divides by a smaller-than-expected total.
    VolumeNotEnough,
}

/// Runs the matching algorithm against a caller-supplied bar stream and a
/// per-day price-limit lookup.
///
/// `limits_for` is queried once per distinct bar date encountered, not once
/// per bar — an order that runs past midnight onto a new trading day picks
/// up that day's limits without the caller having to pre-flatten them into a
/// single `PriceLimits` value.
///
/// Bars are consumed strictly in the order `bars` yields them.
pub fn match_order(
    req: &MatchRequest,
    bars: impl IntoIterator<Item = Bar>,
    limits_for: impl Fn(NaiveDate) -> Option<PriceLimits>,
) -> MatchOutcome {
    let mut remaining = req.requested_shares_micros;
    let mut matched_shares: i64 = 0;
    let mut matched_notional: i128 = 0;
    let mut last_fill_time: Option<NaiveDateTime> = None;
    let mut any_bar_seen = false;
    let mut any_past_limit_ban = false;

    for (idx, bar) in bars.into_iter().enumerate() {
        if remaining <= 0 {
            break;
        }
        any_bar_seen = true;

        // Step 1: the 9:31 open-price substitution applies only to the
        // first bar this call considers.
        let effective_price_micros = if idx == 0 && req.order_time.time() <= open_rule_cutoff() {
            bar.open_micros
        } else {
            bar.close_micros
        };

        // Step 2: discard uncrossable one-sided bars at the daily limit.
        if let Some(limits) = limits_for(bar.minute.date()) {
            let at_limit = if req.is_buy() {
                effective_price_micros == limits.upper_micros
            } else {
                effective_price_micros == limits.lower_micros
            };
            if at_limit {
                continue;
            }
        }
        any_past_limit_ban = true;

        // Step 3: price filter (market orders accept unconditionally).
        let crosses = if req.is_market() {
            true
        } else {
            let limit = match req.limit_price_micros {
                Some(p) => p,
                None => continue,
            };
            if req.is_buy() {
                effective_price_micros <= limit
            } else {
                effective_price_micros >= limit
            }
        };
        if !crosses {
            continue;
        }

        // Step 7 (edge case, issue #31): a crossing bar with zero volume
        // rejects the whole order rather than silently contributing nothing.
        if bar.volume <= 0 {
            return MatchOutcome::VolumeNotEnough;
        }

        // Step 4: consume up to the bar's volume (whole shares), capped at
        // remaining need (micros-scaled).
        let available_micros = bar.volume.saturating_mul(btsim_schemas::micros::MICROS_SCALE);
        let consumed = remaining.min(available_micros);
        if consumed <= 0 {
            continue;
        }

        matched_shares += consumed;
        matched_notional += mul_micros(consumed, effective_price_micros);
        remaining -= consumed;
        last_fill_time = Some(bar.minute);
    }

    if matched_shares <= 0 {
        if any_bar_seen && !any_past_limit_ban {
            return MatchOutcome::PriceLimit;
        }
        return MatchOutcome::NoMatch;
    }

    let price_micros = clamp_i128_to_i64(divide_micros_wide(
        matched_notional,
        matched_shares,
    ));
    let fill_time = last_fill_time.unwrap_or(req.order_time);

    if matched_shares < req.requested_shares_micros {
        MatchOutcome::Partial {
            shares_micros: matched_shares,
            price_micros,
            fill_time,
        }
    } else {
        MatchOutcome::Filled {
            shares_micros: matched_shares,
            price_micros,
            fill_time,
        }
    }
}

/// Whether a requested buy quantity (in micros) is a valid multiple of 100
/// whole shares. `BUY`/`MARKET_BUY` must satisfy this; `SELL`/`MARKET_SELL`/
/// `SELL_PERCENT` may be fractional.
pub fn is_valid_buy_lot_size(shares_micros: i64) -> bool {
    let hundred_shares_micros = 100 * btsim_schemas::micros::MICROS_SCALE;
    shares_micros > 0 && shares_micros % hundred_shares_micros == 0
}

/// Converts a `SELL_PERCENT` fraction (in micros, `(0, 1]`) into a share
/// count against the current unadjusted holding, so the caller can route it
/// as a `MARKET_SELL`.
pub fn sell_percent_shares_micros(fraction_micros: i64, held_shares_micros: i64) -> i64 {
    if fraction_micros <= 0 || held_shares_micros <= 0 {
        return 0;
    }
    clamp_i128_to_i64(mul_micros(held_shares_micros, fraction_micros))
}
