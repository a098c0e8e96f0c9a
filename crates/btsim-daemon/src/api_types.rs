//! Request/response DTOs for every `btsim-daemon` HTTP endpoint. No business
//! logic lives here — only wire shapes and the decimal-string <-> micros
//! conversions at this system's outer boundary.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use btsim_schemas::micros::micros_to_decimal_str;
use btsim_schemas::{
    AccountInfo, AssetsRow, Entrust, ErrorBody, MetricsReport, OrderStatus, PositionSnapshot,
    Side, Trade,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Every successful response wraps its payload with `"status": "success"`;
/// every failed response is instead an [`ErrorBody`] carried as
/// `{ "status": "failed", "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: String,
    pub message: String,
}

impl From<&btsim_schemas::BtsimError> for ErrorResponse {
    fn from(e: &btsim_schemas::BtsimError) -> Self {
        let body: ErrorBody = e.into();
        ErrorResponse {
            status: "failed",
            code: body.code,
            message: body.message,
        }
    }
}

// ---------------------------------------------------------------------------
// start_backtest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StartBacktestRequest {
    pub name: String,
    pub principal: String,
    #[serde(default)]
    pub commission: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Client-chosen token; a server-minted one is assigned if absent.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountInfoView {
    pub name: String,
    pub principal: String,
    pub cash: String,
    pub commission: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub xdxr_cursor: NaiveDate,
}

impl From<AccountInfo> for AccountInfoView {
    fn from(i: AccountInfo) -> Self {
        Self {
            name: i.name,
            principal: micros_to_decimal_str(i.principal_micros),
            cash: micros_to_decimal_str(i.cash_micros),
            commission: micros_to_decimal_str(i.commission_micros),
            start_date: i.start_date,
            end_date: i.end_date,
            xdxr_cursor: i.xdxr_cursor,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartBacktestResponse {
    pub status: &'static str,
    pub token: String,
    pub info: AccountInfoView,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub status: &'static str,
    pub info: AccountInfoView,
}

// ---------------------------------------------------------------------------
// delete_accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAccountsRequest {
    /// Admin-scoped: deletes only the named account. Absent + admin token
    /// deletes every open account. Ignored for a non-admin caller, who may
    /// only delete the account their own bearer token authorizes.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteAccountsResponse {
    pub status: &'static str,
    pub deleted: String,
}

// ---------------------------------------------------------------------------
// buy / sell / market_buy / market_sell / sell_percent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    /// Decimal share count for buy/sell/market_buy/market_sell; decimal
    /// fraction in `(0, 1]` for `sell_percent` (e.g. `"0.5"`).
    pub shares: String,
    /// Required for `buy`/`sell`; absent for market orders.
    #[serde(default)]
    pub price: Option<String>,
    pub order_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub status: &'static str,
    pub order_id: String,
    pub order_status: OrderStatus,
    pub filled_shares: Option<String>,
    pub filled_price: Option<String>,
    pub fee: Option<String>,
}

impl OrderResponse {
    pub fn from_fill(entrust: &Entrust, trade: Option<&Trade>) -> Self {
        OrderResponse {
            status: "success",
            order_id: entrust.order_id.clone(),
            order_status: entrust.status,
            filled_shares: trade.map(|t| micros_to_decimal_str(t.shares_micros)),
            filled_price: trade.map(|t| micros_to_decimal_str(t.price_micros)),
            fee: trade.map(|t| micros_to_decimal_str(t.fee_micros)),
        }
    }
}

// ---------------------------------------------------------------------------
// positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub shares: String,
    pub cost: String,
    pub market_price: String,
    pub market_value: String,
    pub sellable_shares: String,
}

impl From<PositionSnapshot> for PositionView {
    fn from(p: PositionSnapshot) -> Self {
        Self {
            symbol: p.symbol,
            shares: micros_to_decimal_str(p.shares_micros),
            cost: micros_to_decimal_str(p.cost_micros),
            market_price: micros_to_decimal_str(p.market_price_micros),
            market_value: micros_to_decimal_str(p.market_value_micros),
            sellable_shares: micros_to_decimal_str(p.sellable_shares_micros),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionsResponse {
    pub status: &'static str,
    pub positions: Vec<PositionView>,
}

// ---------------------------------------------------------------------------
// bills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EntrustView {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Option<String>,
    pub shares: String,
    pub order_time: NaiveDateTime,
    pub order_status: OrderStatus,
    pub reason: Option<String>,
}

impl From<&Entrust> for EntrustView {
    fn from(e: &Entrust) -> Self {
        Self {
            order_id: e.order_id.clone(),
            symbol: e.symbol.clone(),
            side: e.side,
            price: e.price_micros.map(micros_to_decimal_str),
            shares: micros_to_decimal_str(e.shares_micros),
            order_time: e.order_time,
            order_status: e.status,
            reason: e.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub shares: String,
    pub price: String,
    pub fee: String,
    pub trade_time: NaiveDateTime,
    pub eventual_profit: Option<String>,
}

impl From<&Trade> for TradeView {
    fn from(t: &Trade) -> Self {
        Self {
            trade_id: t.trade_id.clone(),
            symbol: t.symbol.clone(),
            side: t.side,
            shares: micros_to_decimal_str(t.shares_micros),
            price: micros_to_decimal_str(t.price_micros),
            fee: micros_to_decimal_str(t.fee_micros),
            trade_time: t.trade_time,
            eventual_profit: t.eventual_profit_micros.map(micros_to_decimal_str),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillView {
    pub entrust: EntrustView,
    pub trades: Vec<TradeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillsResponse {
    pub status: &'static str,
    pub bills: Vec<BillView>,
}

// ---------------------------------------------------------------------------
// get_assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetsQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetsRowView {
    pub date: NaiveDate,
    pub cash: String,
    pub market_value: String,
    pub total: String,
}

impl From<&AssetsRow> for AssetsRowView {
    fn from(r: &AssetsRow) -> Self {
        Self {
            date: r.date,
            cash: micros_to_decimal_str(r.cash_micros),
            market_value: micros_to_decimal_str(r.market_value_micros),
            total: micros_to_decimal_str(r.total_micros),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetsResponse {
    pub status: &'static str,
    pub assets: Vec<AssetsRowView>,
}

// ---------------------------------------------------------------------------
// metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    pub benchmark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    pub total_return: String,
    pub annualized_return: String,
    pub sharpe: String,
    pub sortino: String,
    pub max_drawdown: String,
    pub calmar: String,
    pub win_rate: String,
    pub benchmark: Option<Box<MetricsView>>,
}

impl From<MetricsReport> for MetricsView {
    fn from(r: MetricsReport) -> Self {
        Self {
            total_return: micros_to_decimal_str(r.total_return_micros),
            annualized_return: micros_to_decimal_str(r.annualized_return_micros),
            sharpe: micros_to_decimal_str(r.sharpe_micros),
            sortino: micros_to_decimal_str(r.sortino_micros),
            max_drawdown: micros_to_decimal_str(r.max_drawdown_micros),
            calmar: micros_to_decimal_str(r.calmar_micros),
            win_rate: micros_to_decimal_str(r.win_rate_micros),
            benchmark: r.benchmark.map(|b| Box::new((*b).into())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub status: &'static str,
    pub metrics: MetricsView,
}

// ---------------------------------------------------------------------------
// stop_backtest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StopBacktestResponse {
    pub status: &'static str,
    pub info: AccountInfoView,
}

// ---------------------------------------------------------------------------
// save_backtest / load_backtest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveBacktestRequest {
    /// Save under a different name than the account's own (a "save as").
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveBacktestResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBacktestRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Client-chosen token for the restored session; server-minted if
    /// absent.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadBacktestResponse {
    pub status: &'static str,
    pub token: String,
    pub info: AccountInfoView,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}
