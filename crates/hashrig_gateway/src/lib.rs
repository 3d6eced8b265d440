//! # HASHRIG Gateway
//!
//! HTTP surface of the HASHRIG economy.
//!
//! ```text
//! client ──> axum Router ──> routes::* ──> GameEconomy
//!                 │                              │
//!            CORS + trace             payout on a blocking thread
//! ```
//!
//! Every rule about money lives in `hashrig_economy`; this crate only decodes
//! requests, calls the economy and encodes responses.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod payout;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use hashrig_economy::{GameEconomy, PayoutGateway};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::GatewayArgs;
pub use payout::{FaucetPayClient, SimulatedPayout};
pub use routes::AppState;

impl AppState {
    /// Bundles the economy with a payout provider.
    #[must_use]
    pub fn new(economy: Arc<GameEconomy>, payout: Arc<dyn PayoutGateway>, qr_service: url::Url) -> Self {
        Self {
            economy,
            payout,
            qr_service,
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        // Players
        .route("/api/user/:id", get(routes::get_user))
        .route("/api/mine", post(routes::mine))
        .route("/api/upgrade", post(routes::upgrade))
        // Payments
        .route("/api/deposit/create", post(routes::create_deposit))
        .route("/api/deposit/:payment_id", get(routes::deposit_status))
        .route("/api/ipn/faucetpay", post(routes::payment_notification))
        .route("/api/withdraw", post(routes::withdraw))
        // Market
        .route("/api/market", get(routes::listings))
        .route("/api/market/sell", post(routes::sell))
        .route("/api/market/buy", post(routes::buy))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
