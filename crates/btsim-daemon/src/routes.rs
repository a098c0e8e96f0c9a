//! Axum router and all HTTP handlers for `btsim-daemon`.
//!
//! `build_router` is the single entry point; handlers are `pub(crate)` so
//! scenario tests can compose the router directly, and every handler takes
//! `State(Arc<AppState>)`. Handlers decode, authorize against the
//! `Registry`, delegate to `btsim-account`, and re-encode; no trading logic
//! lives here.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use btsim_account::{Account, StartBacktestParams};
use btsim_feed::Feed;
use btsim_schemas::micros::decimal_str_to_micros;
use btsim_schemas::{AccountError, BtsimError, Infra};
use tokio::sync::Mutex;

use crate::api_types::*;
use crate::auth::bearer_token;
use crate::state::AppState;

/// Builds the complete application router wired to the given shared state,
/// under the configured `route_prefix`. Middleware layers (CORS,
/// tracing) are not applied here; `main.rs` attaches them after this call so
/// tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let prefix = state.config.server.route_prefix.clone();
    let route = |name: &str| format!("{prefix}{name}");

    Router::new()
        .route("/v1/health", get(health))
        .route(&route("start_backtest"), post(start_backtest))
        .route(&route("delete_accounts"), post(delete_accounts))
        .route(&route("buy"), post(buy))
        .route(&route("sell"), post(sell))
        .route(&route("market_buy"), post(market_buy))
        .route(&route("market_sell"), post(market_sell))
        .route(&route("sell_percent"), post(sell_percent))
        .route(&route("info"), get(info))
        .route(&route("positions"), get(positions))
        .route(&route("bills"), get(bills))
        .route(&route("get_assets"), get(get_assets))
        .route(&route("metrics"), get(metrics))
        .route(&route("stop_backtest"), post(stop_backtest))
        .route(&route("save_backtest"), post(save_backtest))
        .route(&route("load_backtest"), post(load_backtest))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error plumbing
// ---------------------------------------------------------------------------

fn status_for(e: &BtsimError) -> StatusCode {
    match e {
        BtsimError::BadParameter(_) => StatusCode::BAD_REQUEST,
        BtsimError::TradeRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BtsimError::AccountError(AccountError::Unauthorized) => StatusCode::UNAUTHORIZED,
        BtsimError::AccountError(AccountError::AccountExists) => StatusCode::CONFLICT,
        BtsimError::AccountError(AccountError::NotFound) => StatusCode::NOT_FOUND,
        BtsimError::Infra(Infra::FeedTimeout) => StatusCode::GATEWAY_TIMEOUT,
        BtsimError::Infra(Infra::FeedDataMissing) => StatusCode::BAD_GATEWAY,
        BtsimError::Infra(Infra::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turns a domain error into its wire response. Infra errors are logged
/// with the account token.
fn error_response(e: &BtsimError, account_token: Option<&str>) -> Response {
    if let BtsimError::Infra(_) = e {
        tracing::error!(code = e.code(), account = account_token, "infra error");
    }
    (status_for(e), Json(ErrorResponse::from(e))).into_response()
}

/// A wire-level malformed-request failure (bad JSON shape, unparsable
/// decimal string) that never reaches the domain error hierarchy.
fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            status: "failed",
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

async fn authorize(
    st: &AppState,
    headers: &HeaderMap,
) -> Result<(String, Arc<Mutex<Account>>), Response> {
    let token = bearer_token(headers)
        .map_err(|e| error_response(&e, None))?
        .to_string();
    let handle = st
        .registry
        .authorize(&token)
        .await
        .map_err(|e| error_response(&e, Some(&token)))?;
    Ok((token, handle))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        service: "btsim-daemon",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// start_backtest
// ---------------------------------------------------------------------------

async fn start_backtest(
    State(st): State<Arc<AppState>>,
    Json(req): Json<StartBacktestRequest>,
) -> Response {
    let principal_micros = match decimal_str_to_micros(&req.principal) {
        Some(v) => v,
        None => return bad_request("principal is not a valid decimal"),
    };
    let commission_rate_micros = match req.commission.as_deref().map(decimal_str_to_micros) {
        Some(Some(v)) => v,
        Some(None) => return bad_request("commission is not a valid decimal"),
        None => st.config.trading.default_commission_micros,
    };

    let params = StartBacktestParams {
        name: req.name,
        principal_micros,
        commission_rate_micros,
        start_date: req.start,
        end_date: req.end,
        token: req.token,
    };

    match st.registry.start_backtest(params).await {
        Ok((token, info)) => (
            StatusCode::OK,
            Json(StartBacktestResponse {
                status: "success",
                token,
                info: info.into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, None),
    }
}

// ---------------------------------------------------------------------------
// delete_accounts
// ---------------------------------------------------------------------------

async fn delete_accounts(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DeleteAccountsRequest>,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(t) => t.to_string(),
        Err(e) => return error_response(&e, None),
    };

    if st.is_admin(&token) {
        return match &req.name {
            Some(name) => match st.registry.delete_account_by_name(name).await {
                Ok(()) => (
                    StatusCode::OK,
                    Json(DeleteAccountsResponse {
                        status: "success",
                        deleted: name.clone(),
                    }),
                )
                    .into_response(),
                Err(e) => error_response(&e, None),
            },
            None => {
                st.registry.delete_all_accounts().await;
                (
                    StatusCode::OK,
                    Json(DeleteAccountsResponse {
                        status: "success",
                        deleted: "all".to_string(),
                    }),
                )
                    .into_response()
            }
        };
    }

    let handle = match st.registry.authorize(&token).await {
        Ok(h) => h,
        Err(e) => return error_response(&e, None),
    };
    let name = handle.lock().await.name().to_string();
    match st.registry.delete_account(&token).await {
        Ok(()) => (
            StatusCode::OK,
            Json(DeleteAccountsResponse {
                status: "success",
                deleted: name,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, Some(&token)),
    }
}

// ---------------------------------------------------------------------------
// buy / sell / market_buy / market_sell / sell_percent
// ---------------------------------------------------------------------------

fn latest_trade_for<'a>(
    account: &'a Account,
    order_id: &str,
) -> Option<&'a btsim_schemas::Trade> {
    account.trades.iter().rev().find(|t| t.order_id == order_id)
}

async fn buy(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let shares_micros = match decimal_str_to_micros(&req.shares) {
        Some(v) => v,
        None => return bad_request("shares is not a valid decimal"),
    };
    let price_micros = match req.price.as_deref().map(decimal_str_to_micros) {
        Some(Some(v)) => v,
        Some(None) => return bad_request("price is not a valid decimal"),
        None => return bad_request("price is required for a limit buy"),
    };

    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account
        .buy(feed.as_ref(), &req.symbol, price_micros, shares_micros, req.order_time)
        .await
    {
        Ok(entrust) => {
            let trade = latest_trade_for(&account, &entrust.order_id).cloned();
            (StatusCode::OK, Json(OrderResponse::from_fill(&entrust, trade.as_ref()))).into_response()
        }
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn sell(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let shares_micros = match decimal_str_to_micros(&req.shares) {
        Some(v) => v,
        None => return bad_request("shares is not a valid decimal"),
    };
    let price_micros = match req.price.as_deref().map(decimal_str_to_micros) {
        Some(Some(v)) => v,
        Some(None) => return bad_request("price is not a valid decimal"),
        None => return bad_request("price is required for a limit sell"),
    };

    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account
        .sell(feed.as_ref(), &req.symbol, price_micros, shares_micros, req.order_time)
        .await
    {
        Ok(entrust) => {
            let trade = latest_trade_for(&account, &entrust.order_id).cloned();
            (StatusCode::OK, Json(OrderResponse::from_fill(&entrust, trade.as_ref()))).into_response()
        }
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn market_buy(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let shares_micros = match decimal_str_to_micros(&req.shares) {
        Some(v) => v,
        None => return bad_request("shares is not a valid decimal"),
    };

    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account
        .market_buy(feed.as_ref(), &req.symbol, shares_micros, req.order_time)
        .await
    {
        Ok(entrust) => {
            let trade = latest_trade_for(&account, &entrust.order_id).cloned();
            (StatusCode::OK, Json(OrderResponse::from_fill(&entrust, trade.as_ref()))).into_response()
        }
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn market_sell(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let shares_micros = match decimal_str_to_micros(&req.shares) {
        Some(v) => v,
        None => return bad_request("shares is not a valid decimal"),
    };

    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account
        .market_sell(feed.as_ref(), &req.symbol, shares_micros, req.order_time)
        .await
    {
        Ok(entrust) => {
            let trade = latest_trade_for(&account, &entrust.order_id).cloned();
            (StatusCode::OK, Json(OrderResponse::from_fill(&entrust, trade.as_ref()))).into_response()
        }
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn sell_percent(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderRequest>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let fraction_micros = match decimal_str_to_micros(&req.shares) {
        Some(v) => v,
        None => return bad_request("shares is not a valid decimal fraction"),
    };

    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account
        .sell_percent(feed.as_ref(), &req.symbol, fraction_micros, req.order_time)
        .await
    {
        Ok(entrust) => {
            let trade = latest_trade_for(&account, &entrust.order_id).cloned();
            (StatusCode::OK, Json(OrderResponse::from_fill(&entrust, trade.as_ref()))).into_response()
        }
        Err(e) => error_response(&e, Some(&token)),
    }
}

// ---------------------------------------------------------------------------
// info / positions / bills / get_assets
// ---------------------------------------------------------------------------

async fn info(State(st): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (_, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let account = handle.lock().await;
    (
        StatusCode::OK,
        Json(InfoResponse {
            status: "success",
            info: account.info().into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct PositionsQuery {
    as_of: NaiveDate,
}

async fn positions(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<PositionsQuery>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let feed = st.registry.feed().clone();
    let account = handle.lock().await;
    match account.positions(feed.as_ref(), q.as_of).await {
        Ok(snaps) => (
            StatusCode::OK,
            Json(PositionsResponse {
                status: "success",
                positions: snaps.into_iter().map(Into::into).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn bills(State(st): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (_, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let account = handle.lock().await;
    let bills = account
        .bills()
        .into_iter()
        .map(|(e, trades)| BillView {
            entrust: (&e).into(),
            trades: trades.iter().map(Into::into).collect(),
        })
        .collect();
    (
        StatusCode::OK,
        Json(BillsResponse {
            status: "success",
            bills,
        }),
    )
        .into_response()
}

async fn get_assets(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<AssetsQuery>,
) -> Response {
    let (_, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let account = handle.lock().await;
    let assets = account
        .get_assets(q.from, q.to)
        .iter()
        .map(Into::into)
        .collect();
    (
        StatusCode::OK,
        Json(AssetsResponse {
            status: "success",
            assets,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// metrics
// ---------------------------------------------------------------------------

async fn metrics(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<MetricsQuery>,
) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let feed = st.registry.feed().clone();
    let account = handle.lock().await;

    let benchmark_closes = if let Some(symbol) = &q.benchmark {
        let days = feed.trading_days_between(account.config.start_date, account.config.end_date);
        let mut closes = Vec::with_capacity(days.len());
        for day in days {
            match feed.close(symbol, day) {
                Ok(Some(c)) => closes.push((day, c)),
                Ok(None) => {}
                Err(_) => return error_response(&BtsimError::Infra(Infra::FeedDataMissing), Some(&token)),
            }
        }
        Some(closes)
    } else {
        None
    };

    let report = account.metrics(
        benchmark_closes.as_deref(),
        st.config.trading.risk_free_daily_micros,
    );
    (
        StatusCode::OK,
        Json(MetricsResponse {
            status: "success",
            metrics: report.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// stop_backtest
// ---------------------------------------------------------------------------

async fn stop_backtest(State(st): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (token, handle) = match authorize(&st, &headers).await {
        Ok(v) => v,
        Err(r) => return r,
    };
    let feed = st.registry.feed().clone();
    let mut account = handle.lock().await;
    match account.stop(feed.as_ref()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StopBacktestResponse {
                status: "success",
                info: account.info().into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, Some(&token)),
    }
}

// ---------------------------------------------------------------------------
// save_backtest / load_backtest
// ---------------------------------------------------------------------------

async fn save_backtest(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveBacktestRequest>,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(t) => t.to_string(),
        Err(e) => return error_response(&e, None),
    };
    match st
        .registry
        .save_backtest(&token, req.name, req.description)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(SaveBacktestResponse { status: "success" })).into_response(),
        Err(e) => error_response(&e, Some(&token)),
    }
}

async fn load_backtest(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoadBacktestRequest>,
) -> Response {
    match st.registry.load_backtest(&req.name, req.token).await {
        Ok((token, info)) => (
            StatusCode::OK,
            Json(LoadBacktestResponse {
                status: "success",
                token,
                info: info.into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, None),
    }
}
