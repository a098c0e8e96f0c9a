//! In-process scenario tests for `btsim-daemon`'s HTTP surface.
//!
//! These tests spin up the Axum router **without** binding a TCP socket,
//! driving it via `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use btsim_account::Registry;
use btsim_config::BtsimConfig;
use btsim_daemon::{routes, state::AppState};
use btsim_feed::{Bar, MemoryFeed};
use btsim_persistence::MemoryStore;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bar(date: NaiveDate, h: u32, min: u32, price: i64, volume: i64) -> Bar {
    use chrono::{NaiveDateTime, NaiveTime};
    Bar {
        symbol: "000001".to_string(),
        minute: NaiveDateTime::new(date, NaiveTime::from_hms_opt(h, min, 0).unwrap()),
        open_micros: price * 1_000_000,
        high_micros: price * 1_000_000,
        low_micros: price * 1_000_000,
        close_micros: price * 1_000_000,
        volume,
    }
}

/// One trading week seeded with 000001 bars every day at 09:30, so T+1
/// sellability and XDXR-cursor advancement both have somewhere to land.
fn make_state() -> Arc<AppState> {
    let days = vec![d(2022, 1, 3), d(2022, 1, 4), d(2022, 1, 5), d(2022, 1, 6), d(2022, 1, 7)];
    let feed = MemoryFeed::builder()
        .trading_days(days.clone())
        .bars(
            days.iter()
                .map(|day| bar(*day, 9, 30, 10, 1_000_000))
                .collect(),
        )
        .close("000001", d(2022, 1, 3), 10_000_000)
        .close("000001", d(2022, 1, 4), 10_000_000)
        .build();

    let registry = Registry::new(
        Arc::new(feed),
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        false,
    );
    Arc::new(AppState::new(Arc::new(registry), Arc::new(BtsimConfig::default())))
}

fn router(st: &Arc<AppState>) -> axum::Router {
    routes::build_router(Arc::clone(st))
}

async fn call(app: axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    let body = if bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&bytes).expect("body is not valid JSON")
    };
    (status, body)
}

fn post(prefix: &str, endpoint: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(format!("{prefix}{endpoint}"))
        .header("content-type", "application/json");
    if let Some(t) = token {
        b = b.header("authorization", format!("Bearer {t}"));
    }
    b.body(Body::from(body.to_string())).unwrap()
}

fn get(prefix: &str, endpoint: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(format!("{prefix}{endpoint}"));
    if let Some(t) = token {
        b = b.header("authorization", format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

const PREFIX: &str = "/backtest/api/trade/v0.3/";

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let st = make_state();
    let req = Request::builder().method("GET").uri("/v1/health").body(Body::empty()).unwrap();
    let (status, body) = call(router(&st), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

// ---------------------------------------------------------------------------
// start_backtest -> buy -> positions -> sell -> bills -> metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_buy_then_sell() {
    let st = make_state();

    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "start_backtest",
            None,
            json!({
                "name": "acct-lifecycle",
                "principal": "100000",
                "start": "2022-01-03",
                "end": "2022-01-31",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start_backtest body: {body}");
    let token = body["token"].as_str().unwrap().to_string();

    // Buy 100 shares at a limit that crosses the 09:30 bar (price 10.0).
    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "buy",
            Some(&token),
            json!({
                "symbol": "000001",
                "shares": "100",
                "price": "10.50",
                "order_time": "2022-01-03T09:30:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "buy body: {body}");
    assert_eq!(body["order_status"], "Filled");
    assert_eq!(body["filled_shares"], "100");

    // Same-day sell is blocked by the T+1 sellable rule.
    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "sell",
            Some(&token),
            json!({
                "symbol": "000001",
                "shares": "100",
                "price": "9.50",
                "order_time": "2022-01-03T09:31:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "sell body: {body}");

    // Positions as of the purchase day show the new holding.
    let (status, body) = call(
        router(&st),
        get(PREFIX, &format!("positions?as_of=2022-01-03"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "positions body: {body}");
    assert_eq!(body["positions"][0]["symbol"], "000001");
    assert_eq!(body["positions"][0]["shares"], "100");

    // Next trading day, the position is sellable.
    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "market_sell",
            Some(&token),
            json!({
                "symbol": "000001",
                "shares": "100",
                "order_time": "2022-01-04T09:30:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "market_sell body: {body}");
    assert_eq!(body["order_status"], "Filled");

    // bills() shows every entrust including the rejected same-day sell.
    let (status, body) = call(router(&st), get(PREFIX, "bills", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bills"].as_array().unwrap().len(), 3);

    // metrics() runs end to end without a benchmark.
    let (status, body) = call(router(&st), get(PREFIX, "metrics", Some(&token))).await;
    assert_eq!(status, StatusCode::OK, "metrics body: {body}");
    assert!(body["metrics"]["total_return"].is_string());
}

// ---------------------------------------------------------------------------
// Cash shortage is rejected and leaves the account untouched
// ---------------------------------------------------------------------------

#[tokio::test]
async fn buy_exceeding_cash_is_rejected() {
    let st = make_state();
    let (_, body) = call(
        router(&st),
        post(
            PREFIX,
            "start_backtest",
            None,
            json!({"name": "acct-poor", "principal": "100", "start": "2022-01-03", "end": "2022-01-31"}),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "buy",
            Some(&token),
            json!({"symbol": "000001", "shares": "100", "price": "10.50", "order_time": "2022-01-03T09:30:00"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "buy body: {body}");
    assert_eq!(body["code"], "CASH_SHORTAGE");

    let (_, info_body) = call(router(&st), get(PREFIX, "info", Some(&token))).await;
    assert_eq!(info_body["info"]["cash"], "100");
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let st = make_state();
    let (status, _) = call(router(&st), get(PREFIX, "info", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let st = make_state();
    let (status, _) = call(router(&st), get(PREFIX, "info", Some("not-a-real-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// delete_accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn own_account_can_delete_itself_but_not_others() {
    let st = make_state();
    let (_, body) = call(
        router(&st),
        post(
            PREFIX,
            "start_backtest",
            None,
            json!({"name": "acct-self-delete", "principal": "1000", "start": "2022-01-03", "end": "2022-01-31"}),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(
        router(&st),
        post(PREFIX, "delete_accounts", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "delete_accounts body: {body}");
    assert_eq!(body["deleted"], "acct-self-delete");

    let (status, _) = call(router(&st), get(PREFIX, "info", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "token should be revoked after self-delete");
}

#[tokio::test]
async fn admin_token_deletes_all_accounts() {
    let st = make_state();
    for name in ["acct-admin-1", "acct-admin-2"] {
        call(
            router(&st),
            post(
                PREFIX,
                "start_backtest",
                None,
                json!({"name": name, "principal": "1000", "start": "2022-01-03", "end": "2022-01-31"}),
            ),
        )
        .await;
    }

    let (status, body) = call(
        router(&st),
        post(
            PREFIX,
            "delete_accounts",
            Some(&st.config.server.admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "delete_accounts body: {body}");
    assert_eq!(body["deleted"], "all");
}

// ---------------------------------------------------------------------------
// save_backtest / load_backtest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_then_load_restores_the_account_under_a_new_token() {
    let st = make_state();
    let (_, body) = call(
        router(&st),
        post(
            PREFIX,
            "start_backtest",
            None,
            json!({"name": "acct-persist", "principal": "100000", "start": "2022-01-03", "end": "2022-01-31"}),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    call(
        router(&st),
        post(
            PREFIX,
            "buy",
            Some(&token),
            json!({"symbol": "000001", "shares": "100", "price": "10.50", "order_time": "2022-01-03T09:30:00"}),
        ),
    )
    .await;

    let (status, _) = call(router(&st), post(PREFIX, "save_backtest", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        router(&st),
        post(PREFIX, "load_backtest", None, json!({"name": "acct-persist"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "load_backtest body: {body}");
    assert_ne!(body["token"].as_str().unwrap(), token, "loaded account gets a fresh token");
    assert_eq!(body["info"]["name"], "acct-persist");
}

// ---------------------------------------------------------------------------
// Unknown routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let st = make_state();
    let req = Request::builder().method("GET").uri("/v1/does_not_exist").body(Body::empty()).unwrap();
    let (status, _) = call(router(&st), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
