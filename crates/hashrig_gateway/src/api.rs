//! Wire types and error mapping.
//!
//! Request and response bodies use camelCase field names. Amounts accept a
//! JSON number or a decimal string and are always rendered as strings.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hashrig_economy::{EconomyError, FixedPoint, Item, ItemId, Listing, ListingId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Errors
// ============================================================================

/// An error rendered as `{"error": ..., "code": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status and code.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// A 400 for a malformed or incomplete request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// A 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<EconomyError> for ApiError {
    fn from(error: EconomyError) -> Self {
        let status = match &error {
            EconomyError::PayoutFailed(_) => StatusCode::BAD_GATEWAY,
            EconomyError::UnknownPlayer(_) => StatusCode::NOT_FOUND,
            EconomyError::ArithmeticOverflow | EconomyError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, error.code(), error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, "{}", self.message);
        }
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Rejects blank player ids. Anything else passes through unchanged.
///
/// # Errors
///
/// `ApiError::bad_request` when `user_id` is empty or whitespace.
pub fn require_user(user_id: &str) -> Result<&str, ApiError> {
    if user_id.trim().is_empty() {
        Err(ApiError::bad_request("userId is required"))
    } else {
        Ok(user_id)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `POST /api/mine`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    /// Player id.
    pub user_id: String,
}

/// `POST /api/upgrade`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    /// Player id.
    pub user_id: String,
    /// Upgrade kind.
    #[serde(rename = "type")]
    pub kind: String,
}

/// `POST /api/deposit/create`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    /// Player id.
    pub user_id: String,
    /// Amount the player intends to send.
    pub amount: FixedPoint,
}

/// `POST /api/market/sell`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    /// Seller id.
    pub user_id: String,
    /// Item to list.
    pub item_id: ItemId,
    /// Asking price.
    pub price: FixedPoint,
}

/// `POST /api/market/buy`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    /// Buyer id.
    pub user_id: String,
    /// Listing to buy.
    pub listing_id: ListingId,
}

/// `POST /api/withdraw`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    /// Player id.
    pub user_id: String,
    /// Payout destination.
    pub to_address: String,
    /// Amount to withdraw.
    pub amount: FixedPoint,
}

// ============================================================================
// Responses
// ============================================================================

/// `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Result of a mine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MineResponse {
    /// Always true.
    pub success: bool,
    /// Coins credited.
    pub reward: u64,
    /// Coin balance afterwards.
    pub new_balance: u64,
    /// Mining power used.
    pub power: u64,
    /// Dropped item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    /// Advisory worth of the dropped item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_worth: Option<FixedPoint>,
}

/// Result of an upgrade.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResponse {
    /// Always true.
    pub success: bool,
    /// Coin balance afterwards.
    pub new_balance: u64,
    /// Level afterwards.
    pub new_level: u32,
    /// Coins spent.
    pub cost: u64,
    /// Price of the next level.
    pub next_cost: u64,
    /// Mining power afterwards.
    pub current_power: u64,
}

/// Deposit instructions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    /// Always true.
    pub success: bool,
    /// Destination wallet.
    pub address: String,
    /// Payment reference to put in the memo.
    pub payment_id: String,
    /// Requested amount.
    pub amount: FixedPoint,
    /// QR image for the memo URI.
    pub qr_code_link: String,
}

/// Result of listing an item.
#[derive(Debug, Serialize)]
pub struct SellResponse {
    /// Always true.
    pub success: bool,
    /// The new listing.
    pub listing: Listing,
}

/// Result of buying a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyResponse {
    /// Always true.
    pub success: bool,
    /// Buyer's real balance afterwards.
    pub new_balance: FixedPoint,
    /// The purchased item.
    pub item: Item,
}

/// Result of a withdrawal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    /// Always true.
    pub success: bool,
    /// Transfer reference.
    pub reference: String,
    /// Real balance afterwards.
    pub new_balance: FixedPoint,
    /// Provider message.
    pub message: String,
}
