//! End-to-end tests of the HTTP surface.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hashrig_economy::{
    Amount, EconomyConfig, EconomyError, EconomyResult, GameEconomy, PayoutConfirmation,
    PayoutGateway, PayoutRequest,
};
use hashrig_gateway::config::QR_SERVICE_URL;
use hashrig_gateway::{router, AppState, SimulatedPayout};
use serde_json::{json, Value};
use tower::ServiceExt;

struct Unreachable;

impl PayoutGateway for Unreachable {
    fn send(&self, _: &PayoutRequest) -> EconomyResult<PayoutConfirmation> {
        Err(EconomyError::PayoutFailed("connection refused".into()))
    }
}

fn economy() -> Arc<GameEconomy> {
    let mut config = EconomyConfig::default();
    config.mining.seed = Some(99);
    config.mining.drop_chance_bp = 10_000;
    Arc::new(GameEconomy::new(config).unwrap())
}

fn app_with(economy: Arc<GameEconomy>, payout: Arc<dyn PayoutGateway>) -> Router {
    router(AppState::new(economy, payout, QR_SERVICE_URL.parse().unwrap()))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_fresh_user_view() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(&app, get("/api/user/alice")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["coins"], 0);
    assert_eq!(body["realBalance"], "0.00000000");
    assert_eq!(body["currentPower"], 1);
    assert_eq!(body["levels"]["cpu"], 1);
    assert_eq!(body["upgradePrices"]["cpu"], 10);
    assert_eq!(body["upgradePrices"]["electricity"], 50);
}

#[tokio::test]
async fn test_mine_always_drops_with_full_chance() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(&app, post("/api/mine", &json!({"userId": "alice"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["power"], 1);
    assert!(body["item"]["id"].is_string());
    assert!(["GPU", "ASIC", "RIG"].contains(&body["item"]["type"].as_str().unwrap()));

    let (_, user) = call(&app, get("/api/user/alice")).await;
    assert_eq!(user["inventory"].as_array().unwrap().len(), 1);
    assert_eq!(user["coins"], body["newBalance"]);
}

#[tokio::test]
async fn test_upgrade_errors_and_success() {
    let economy = economy();
    let app = app_with(Arc::clone(&economy), Arc::new(SimulatedPayout));

    let (status, body) = call(
        &app,
        post("/api/upgrade", &json!({"userId": "bob", "type": "cpu"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_funds");

    let (status, body) = call(
        &app,
        post("/api/upgrade", &json!({"userId": "bob", "type": "turbo"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_upgrade");

    economy.ledger().credit("bob", Amount::Coins(10)).unwrap();
    let (status, body) = call(
        &app,
        post("/api/upgrade", &json!({"userId": "bob", "type": "cpu"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cost"], 10);
    assert_eq!(body["newLevel"], 2);
    assert_eq!(body["nextCost"], 15);
    assert_eq!(body["currentPower"], 3);
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(&app, post("/api/mine", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = call(&app, post("/api/mine", &json!({"userId": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deposit_then_ipn_credits_reported_amount_once() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, ticket) = call(
        &app,
        post("/api/deposit/create", &json!({"userId": "carol", "amount": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payment_id = ticket["paymentId"].as_str().unwrap().to_string();
    assert!(payment_id.starts_with("uid_carol_"));
    assert_eq!(ticket["address"], "TTestAddress");
    let qr = ticket["qrCodeLink"].as_str().unwrap();
    assert!(qr.starts_with("https://api.qrserver.com/v1/create-qr-code/?size=200x200&data="));

    let form = format!("memo={payment_id}&amount=7.5");
    for _ in 0..2 {
        let request = Request::post("/api/ipn/faucetpay")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.clone()))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("OK".into()));
    }

    let (_, user) = call(&app, get("/api/user/carol")).await;
    assert_eq!(user["realBalance"], "7.50000000");

    let (status, deposit) = call(&app, get(&format!("/api/deposit/{payment_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deposit["status"], "completed");
    assert_eq!(deposit["credited"], "7.50000000");
}

#[tokio::test]
async fn test_ipn_never_fails() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    for (content_type, body) in [
        ("application/json", r#"{"custom":"uid_nobody_0000000000","amount":"5"}"#),
        ("application/json", "garbage"),
        ("text/plain", ""),
    ] {
        let request = Request::post("/api/ipn/faucetpay")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_json_ipn_with_tiny_numeric_amount_credits() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (_, ticket) = call(
        &app,
        post("/api/deposit/create", &json!({"userId": "dave", "amount": "0.00000005"})),
    )
    .await;
    let payment_id = ticket["paymentId"].as_str().unwrap();

    let request = Request::post("/api/ipn/faucetpay")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(
            r#"{{"custom":"{payment_id}","amount":0.00000005}}"#
        )))
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, user) = call(&app, get("/api/user/dave")).await;
    assert_eq!(user["realBalance"], "0.00000005");
    let (_, deposit) = call(&app, get(&format!("/api/deposit/{payment_id}"))).await;
    assert_eq!(deposit["status"], "completed");
}

#[tokio::test]
async fn test_player_ids_are_not_trimmed() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, _) = call(&app, post("/api/mine", &json!({"userId": " erin"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, padded) = call(&app, get("/api/user/%20erin")).await;
    assert_eq!(padded["id"], " erin");
    assert_eq!(padded["inventory"].as_array().unwrap().len(), 1);

    let (_, plain) = call(&app, get("/api/user/erin")).await;
    assert!(plain["inventory"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_deposit_is_not_found() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(&app, get("/api/deposit/uid_x_0000000000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_sell_and_buy() {
    let economy = economy();
    let app = app_with(Arc::clone(&economy), Arc::new(SimulatedPayout));

    let (_, mined) = call(&app, post("/api/mine", &json!({"userId": "seller"}))).await;
    let item_id = mined["item"]["id"].as_str().unwrap().to_string();

    let (status, sold) = call(
        &app,
        post(
            "/api/market/sell",
            &json!({"userId": "seller", "itemId": item_id, "price": "5.0"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listing_id = sold["listing"]["id"].as_str().unwrap().to_string();
    assert_eq!(sold["listing"]["sellerId"], "seller");

    let (_, book) = call(&app, get("/api/market")).await;
    assert_eq!(book.as_array().unwrap().len(), 1);

    let buy = json!({"userId": "buyer", "listingId": listing_id});
    let (status, body) = call(&app, post("/api/market/buy", &buy)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_funds");

    economy
        .ledger()
        .credit("buyer", Amount::Real("5".parse().unwrap()))
        .unwrap();
    let (status, body) = call(&app, post("/api/market/buy", &buy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newBalance"], "0.00000000");
    assert_eq!(body["item"]["id"], item_id.as_str());

    let (status, body) = call(&app, post("/api/market/buy", &buy)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "listing_not_found");

    let (_, seller) = call(&app, get("/api/user/seller")).await;
    assert_eq!(seller["realBalance"], "5.00000000");
    let (_, book) = call(&app, get("/api/market")).await;
    assert!(book.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sell_unknown_item() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, body) = call(
        &app,
        post(
            "/api/market/sell",
            &json!({"userId": "x", "itemId": uuid::Uuid::new_v4(), "price": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "item_not_found");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_withdraw_simulated() {
    let economy = economy();
    economy
        .ledger()
        .credit("dave", Amount::Real("3".parse().unwrap()))
        .unwrap();
    let app = app_with(Arc::clone(&economy), Arc::new(SimulatedPayout));

    let (status, body) = call(
        &app,
        post(
            "/api/withdraw",
            &json!({"userId": "dave", "toAddress": "dave@faucetpay", "amount": 1.5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["newBalance"], "1.50000000");

    let (status, body) = call(
        &app,
        post(
            "/api/withdraw",
            &json!({"userId": "dave", "toAddress": "dave@faucetpay", "amount": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_funds");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_withdraw_payout_failure_is_bad_gateway() {
    let economy = economy();
    economy
        .ledger()
        .credit("erin", Amount::Real("3".parse().unwrap()))
        .unwrap();
    let app = app_with(Arc::clone(&economy), Arc::new(Unreachable));

    let (status, body) = call(
        &app,
        post(
            "/api/withdraw",
            &json!({"userId": "erin", "toAddress": "erin@faucetpay", "amount": "1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "payout_failed");

    let (_, user) = call(&app, get("/api/user/erin")).await;
    assert_eq!(user["realBalance"], "3.00000000");
    assert_eq!(user["heldBalance"], "0.00000000");
}

#[tokio::test]
async fn test_withdraw_requires_destination() {
    let app = app_with(economy(), Arc::new(SimulatedPayout));
    let (status, _) = call(
        &app,
        post(
            "/api/withdraw",
            &json!({"userId": "x", "toAddress": " ", "amount": "1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
