//! Payout providers.
//!
//! Both implement [`PayoutGateway`] and are called from a blocking thread.

use std::time::Duration;

use hashrig_economy::{EconomyError, EconomyResult, PayoutConfirmation, PayoutGateway, PayoutRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confirms every payout without moving money. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedPayout;

impl PayoutGateway for SimulatedPayout {
    fn send(&self, request: &PayoutRequest) -> EconomyResult<PayoutConfirmation> {
        tracing::warn!(
            reference = %request.reference,
            amount = %request.amount,
            destination = %request.destination,
            "payout simulated; no funds were sent"
        );
        Ok(PayoutConfirmation {
            message: "Withdrawal processed (simulated)".to_string(),
        })
    }
}

/// Why a FaucetPay call failed.
#[derive(Debug, Error)]
pub enum FaucetPayError {
    /// The request never produced a usable response.
    #[error("faucetpay transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// FaucetPay answered with a non-200 status.
    #[error("faucetpay rejected payout (status {status}): {message}")]
    Rejected {
        /// Status reported in the response body.
        status: i64,
        /// Provider message.
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    api_key: &'a str,
    to: &'a str,
    amount: String,
    currency: &'a str,
    #[serde(rename = "ref")]
    reference: &'a str,
}

/// The fields of a FaucetPay response this client reads.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    /// Provider status code; 200 means sent.
    pub status: i64,
    /// Provider message.
    #[serde(default)]
    pub message: String,
}

impl SendResponse {
    /// Converts the provider answer into a confirmation.
    ///
    /// # Errors
    ///
    /// `FaucetPayError::Rejected` unless `status == 200`.
    pub fn into_confirmation(self) -> Result<PayoutConfirmation, FaucetPayError> {
        if self.status == 200 {
            Ok(PayoutConfirmation {
                message: if self.message.is_empty() {
                    "Withdrawal sent".to_string()
                } else {
                    self.message
                },
            })
        } else {
            Err(FaucetPayError::Rejected {
                status: self.status,
                message: self.message,
            })
        }
    }
}

/// Live FaucetPay client.
#[derive(Debug)]
pub struct FaucetPayClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl FaucetPayClient {
    /// Builds a client. Must not be called from inside an async context.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FaucetPayError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn post(&self, request: &PayoutRequest) -> Result<PayoutConfirmation, FaucetPayError> {
        let body = SendBody {
            api_key: &self.api_key,
            to: &request.destination,
            amount: request.amount.to_string(),
            currency: &request.currency,
            reference: &request.reference,
        };

        let response: SendResponse = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()?
            .json()?;
        response.into_confirmation()
    }
}

impl PayoutGateway for FaucetPayClient {
    fn send(&self, request: &PayoutRequest) -> EconomyResult<PayoutConfirmation> {
        self.post(request).map_err(|e| {
            tracing::error!(reference = %request.reference, error = %e, "faucetpay payout failed");
            EconomyError::PayoutFailed(e.to_string())
        })
    }
}
