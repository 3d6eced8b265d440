//! HTTP handlers.
//!
//! Handlers translate wire types and call [`GameEconomy`]. Economy calls are
//! short critical sections and run inline; only the payout provider call is
//! moved to a blocking thread.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use hashrig_economy::payment::AMOUNT_FIELD;
use hashrig_economy::{
    FixedPoint, GameEconomy, Listing, NotificationOutcome, PaymentNotification, PayoutGateway, PendingDeposit,
    PlayerView,
};

use crate::api::{
    require_user, ApiError, ApiResult, BuyRequest, BuyResponse, DepositRequest, DepositResponse,
    HealthResponse, MineRequest, MineResponse, SellRequest, SellResponse, UpgradeRequest,
    UpgradeResponse, WithdrawRequest, WithdrawResponse,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The economy.
    pub economy: Arc<GameEconomy>,
    /// Payout provider for withdrawals.
    pub payout: Arc<dyn PayoutGateway>,
    /// QR image service for deposit links.
    pub qr_service: url::Url,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("economy", &self.economy)
            .field("qr_service", &self.qr_service.as_str())
            .finish_non_exhaustive()
    }
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/user/:id`
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<PlayerView> {
    let id = require_user(&id)?;
    Ok(Json(state.economy.player_view(id)))
}

/// `POST /api/mine`
pub async fn mine(
    State(state): State<AppState>,
    payload: Result<Json<MineRequest>, JsonRejection>,
) -> ApiResult<MineResponse> {
    let Json(request) = payload?;
    let outcome = state.economy.mine(require_user(&request.user_id)?)?;

    let (item, estimated_worth) = match outcome.drop {
        Some(drop) => (Some(drop.item), Some(drop.estimated_worth)),
        None => (None, None),
    };
    Ok(Json(MineResponse {
        success: true,
        reward: outcome.reward,
        new_balance: outcome.new_balance,
        power: outcome.power,
        item,
        estimated_worth,
    }))
}

/// `POST /api/upgrade`
pub async fn upgrade(
    State(state): State<AppState>,
    payload: Result<Json<UpgradeRequest>, JsonRejection>,
) -> ApiResult<UpgradeResponse> {
    let Json(request) = payload?;
    let user = require_user(&request.user_id)?;
    let receipt = state.economy.upgrade(user, &request.kind)?;

    Ok(Json(UpgradeResponse {
        success: true,
        new_balance: receipt.new_balance,
        new_level: receipt.new_level,
        cost: receipt.cost,
        next_cost: receipt.next_cost,
        current_power: state.economy.player_view(user).current_power,
    }))
}

/// `POST /api/deposit/create`
pub async fn create_deposit(
    State(state): State<AppState>,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> ApiResult<DepositResponse> {
    let Json(request) = payload?;
    let ticket = state
        .economy
        .create_deposit(require_user(&request.user_id)?, request.amount)?;

    let mut qr = state.qr_service.clone();
    qr.query_pairs_mut()
        .append_pair("size", "200x200")
        .append_pair("data", &ticket.memo_uri);

    Ok(Json(DepositResponse {
        success: true,
        address: ticket.address,
        payment_id: ticket.reference,
        amount: ticket.amount,
        qr_code_link: qr.into(),
    }))
}

/// `GET /api/deposit/:paymentId`
pub async fn deposit_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<PendingDeposit> {
    state
        .economy
        .deposit_status(&reference)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("deposit not found: {reference}")))
}

/// Decodes a provider callback body, JSON or form encoded.
///
/// Scalars become strings; nested values are dropped. Anything undecodable
/// yields an empty notification.
#[must_use]
pub fn decode_notification(headers: &HeaderMap, body: &[u8]) -> PaymentNotification {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));

    if is_json {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
            return map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    serde_json::Value::String(s) => Some((key, s)),
                    serde_json::Value::Number(n) if key == AMOUNT_FIELD => {
                        Some((key, amount_text(&n)))
                    }
                    serde_json::Value::Number(n) => Some((key, n.to_string())),
                    serde_json::Value::Bool(b) => Some((key, b.to_string())),
                    _ => None,
                })
                .collect();
        }
    }

    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Renders a numeric amount as a plain decimal.
///
/// `Number::to_string` switches to exponent notation for small floats
/// (`5e-8`), which the amount parser rejects.
fn amount_text(n: &serde_json::Number) -> String {
    serde_json::from_value::<FixedPoint>(serde_json::Value::Number(n.clone()))
        .map_or_else(|_| n.to_string(), |amount| amount.to_string())
}

/// `POST /api/ipn/faucetpay`
///
/// Always answers `200 OK`: the sender retries anything else, and unmatched
/// or duplicate notifications are expected.
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> &'static str {
    let notification = decode_notification(&headers, &body);
    match state.economy.on_payment_notification(&notification) {
        NotificationOutcome::Credited { reference, amount, .. } => {
            tracing::debug!(%reference, %amount, "notification credited");
        }
        other => tracing::debug!(outcome = ?other, "notification not credited"),
    }
    "OK"
}

/// `POST /api/market/sell`
pub async fn sell(
    State(state): State<AppState>,
    payload: Result<Json<SellRequest>, JsonRejection>,
) -> ApiResult<SellResponse> {
    let Json(request) = payload?;
    let listing = state.economy.list_item(
        require_user(&request.user_id)?,
        request.item_id,
        request.price,
    )?;
    Ok(Json(SellResponse {
        success: true,
        listing,
    }))
}

/// `POST /api/market/buy`
pub async fn buy(
    State(state): State<AppState>,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> ApiResult<BuyResponse> {
    let Json(request) = payload?;
    let purchase = state
        .economy
        .fulfill_listing(require_user(&request.user_id)?, request.listing_id)?;
    Ok(Json(BuyResponse {
        success: true,
        new_balance: purchase.buyer_balance,
        item: purchase.listing.item,
    }))
}

/// `GET /api/market`
pub async fn listings(State(state): State<AppState>) -> Json<Vec<Listing>> {
    Json(state.economy.listings())
}

/// `POST /api/withdraw`
pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> ApiResult<WithdrawResponse> {
    let Json(request) = payload?;
    let user = require_user(&request.user_id)?.to_string();
    let destination = request.to_address.trim().to_string();
    if destination.is_empty() {
        return Err(ApiError::bad_request("toAddress is required"));
    }

    let economy = Arc::clone(&state.economy);
    let payout = Arc::clone(&state.payout);
    let receipt = tokio::task::spawn_blocking(move || {
        economy.withdraw(payout.as_ref(), &user, request.amount, &destination)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "withdrawal task failed");
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "withdrawal task failed",
        )
    })??;

    Ok(Json(WithdrawResponse {
        success: true,
        reference: receipt.reference,
        new_balance: receipt.new_balance,
        message: receipt.confirmation,
    }))
}
