//! # Payment Bridge
//!
//! Moves real currency across the system boundary.
//!
//! ## Deposits
//!
//! ```text
//! create_deposit ──> reference "uid_<player>_<10 hex>" recorded as Pending
//!                        │
//! provider callback ─────┘ on_payment_notification
//!     reference = first non-empty of custom | memo | trx_id
//!     Pending   -> credit REPORTED amount, mark Completed
//!     Completed -> Duplicate, nothing credited
//!     unknown   -> Unmatched, ignored
//! ```
//!
//! The callback sender is an untrusted, retrying webhook: notifications are
//! classified and logged, never rejected.
//!
//! ## Withdrawals
//!
//! Funds move into the account's hold before the payout call and leave the
//! ledger only once the provider confirms. A failed payout releases the hold,
//! so the spendable balance is exactly what it was before the request.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;
use crate::ledger::{Amount, Ledger, PlayerId};

/// Notification fields that may carry the payment reference, in priority order.
pub const REFERENCE_FIELDS: [&str; 3] = ["custom", "memo", "trx_id"];

/// Notification field carrying the paid amount.
pub const AMOUNT_FIELD: &str = "amount";

/// Length of the random suffix of a payment reference.
const REFERENCE_SUFFIX_LEN: usize = 10;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(REFERENCE_SUFFIX_LEN);
    suffix
}

/// Lifecycle of a deposit. There is no failed or expired state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Waiting for the provider's notification.
    Pending,
    /// Credited once; further notifications are duplicates.
    Completed,
}

/// A deposit the player has announced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeposit {
    /// Payment reference.
    pub reference: String,
    /// Depositing player.
    pub player_id: PlayerId,
    /// Amount the player said they would send.
    pub requested: FixedPoint,
    /// Current status.
    pub status: DepositStatus,
    /// Creation time, unix milliseconds.
    pub created_at: u64,
    /// Amount actually credited, once completed.
    pub credited: Option<FixedPoint>,
}

/// What the player needs to make a deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositTicket {
    /// Payment reference to put in the transfer memo.
    pub reference: String,
    /// Destination wallet.
    pub address: String,
    /// Requested amount.
    pub amount: FixedPoint,
    /// `"{address}?memo={reference}"`, the payload for a QR code.
    pub memo_uri: String,
}

/// Loosely structured provider callback.
///
/// Field names are kept verbatim; values are kept as text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentNotification {
    fields: BTreeMap<String, String>,
}

impl PaymentNotification {
    /// Creates an empty notification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The payment reference: first non-empty field of [`REFERENCE_FIELDS`].
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        REFERENCE_FIELDS
            .iter()
            .filter_map(|field| self.get(field))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    /// The reported amount, if present and parseable.
    #[must_use]
    pub fn amount(&self) -> Option<FixedPoint> {
        self.get(AMOUNT_FIELD)?.parse().ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PaymentNotification {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// How a notification was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The deposit was credited with the reported amount.
    Credited {
        /// Reference of the completed deposit.
        reference: String,
        /// Credited player.
        player_id: PlayerId,
        /// Amount credited.
        amount: FixedPoint,
    },
    /// The deposit was already completed; nothing credited.
    Duplicate {
        /// Reference of the completed deposit.
        reference: String,
    },
    /// No reference, or a reference with no pending deposit.
    Unmatched {
        /// The reference found, if any.
        reference: Option<String>,
    },
    /// Reference matched but the amount was missing, unparseable or zero.
    Malformed {
        /// Reference of the still-pending deposit.
        reference: String,
    },
}

/// Outbound transfer handed to the payout provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayoutRequest {
    /// Amount to send.
    pub amount: FixedPoint,
    /// Destination address or account.
    pub destination: String,
    /// Currency code.
    pub currency: String,
    /// Our reference for the transfer.
    pub reference: String,
}

/// Provider's acknowledgement of a payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayoutConfirmation {
    /// Human-readable provider message.
    pub message: String,
}

/// Executes payouts against an external provider.
///
/// Implementations may block; callers on an async runtime must run
/// [`PaymentBridge::withdraw`] on a blocking thread.
pub trait PayoutGateway: Send + Sync {
    /// Sends the transfer.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::PayoutFailed` if the provider rejected the
    /// transfer or could not be reached.
    fn send(&self, request: &PayoutRequest) -> EconomyResult<PayoutConfirmation>;
}

/// A finalized withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    /// Our reference for the transfer.
    pub reference: String,
    /// Withdrawing player.
    pub player_id: PlayerId,
    /// Amount that left the ledger.
    pub amount: FixedPoint,
    /// Destination address.
    pub destination: String,
    /// Provider's message.
    pub confirmation: String,
    /// Spendable real balance afterwards.
    pub new_balance: FixedPoint,
}

/// Deposit correlation and withdrawal orchestration.
#[derive(Debug)]
pub struct PaymentBridge {
    config: PaymentConfig,
    deposits: Mutex<HashMap<String, PendingDeposit>>,
}

impl PaymentBridge {
    /// Creates a bridge with no deposits.
    #[must_use]
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            deposits: Mutex::new(HashMap::new()),
        }
    }

    /// Payment settings in use.
    #[must_use]
    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Records a pending deposit and returns what the player needs to pay it.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidAmount` for a zero amount.
    pub fn create_deposit(&self, player_id: &str, amount: FixedPoint) -> EconomyResult<DepositTicket> {
        if amount.is_zero() {
            return Err(EconomyError::InvalidAmount("deposit amount must be positive".into()));
        }

        let mut deposits = self.deposits.lock();
        let reference = loop {
            let candidate = format!(
                "{}_{}_{}",
                self.config.reference_prefix,
                player_id,
                random_suffix()
            );
            if !deposits.contains_key(&candidate) {
                break candidate;
            }
        };

        deposits.insert(
            reference.clone(),
            PendingDeposit {
                reference: reference.clone(),
                player_id: player_id.to_string(),
                requested: amount,
                status: DepositStatus::Pending,
                created_at: now_millis(),
                credited: None,
            },
        );
        drop(deposits);

        tracing::info!(player = player_id, reference = %reference, %amount, "deposit created");

        let address = self.config.wallet_address.clone();
        Ok(DepositTicket {
            memo_uri: format!("{address}?memo={reference}"),
            reference,
            address,
            amount,
        })
    }

    /// Looks up a deposit by reference.
    #[must_use]
    pub fn deposit(&self, reference: &str) -> Option<PendingDeposit> {
        self.deposits.lock().get(reference).cloned()
    }

    /// Handles a provider callback. Never fails.
    ///
    /// The deposit lock is held while the ledger is credited, so concurrent
    /// deliveries of the same notification credit at most once.
    pub fn on_payment_notification(
        &self,
        ledger: &Ledger,
        notification: &PaymentNotification,
    ) -> NotificationOutcome {
        let Some(reference) = notification.reference() else {
            tracing::warn!("payment notification without reference ignored");
            return NotificationOutcome::Unmatched { reference: None };
        };

        let mut deposits = self.deposits.lock();
        let Some(deposit) = deposits.get_mut(reference) else {
            tracing::warn!(reference, "payment notification for unknown deposit ignored");
            return NotificationOutcome::Unmatched {
                reference: Some(reference.to_string()),
            };
        };

        if deposit.status == DepositStatus::Completed {
            tracing::info!(reference, "duplicate payment notification ignored");
            return NotificationOutcome::Duplicate {
                reference: reference.to_string(),
            };
        }

        let amount = match notification.amount() {
            Some(amount) if !amount.is_zero() => amount,
            _ => {
                tracing::warn!(
                    reference,
                    raw = notification.get(AMOUNT_FIELD).unwrap_or(""),
                    "payment notification with unusable amount ignored"
                );
                return NotificationOutcome::Malformed {
                    reference: reference.to_string(),
                };
            }
        };

        if let Err(error) = ledger.credit(&deposit.player_id, Amount::Real(amount)) {
            tracing::error!(reference, %error, "deposit credit failed");
            return NotificationOutcome::Malformed {
                reference: reference.to_string(),
            };
        }

        deposit.status = DepositStatus::Completed;
        deposit.credited = Some(amount);

        if amount != deposit.requested {
            tracing::info!(
                reference,
                requested = %deposit.requested,
                reported = %amount,
                "deposit amount differs from request; crediting reported amount"
            );
        }
        tracing::info!(player = %deposit.player_id, reference, %amount, "deposit credited");

        NotificationOutcome::Credited {
            reference: reference.to_string(),
            player_id: deposit.player_id.clone(),
            amount,
        }
    }

    /// Pays real currency out to `destination`.
    ///
    /// Blocks for as long as `payout` does. No lock is held during the call.
    ///
    /// # Errors
    ///
    /// - `EconomyError::InvalidAmount` for a zero amount
    /// - `EconomyError::InsufficientFunds` if the spendable balance is short
    /// - `EconomyError::PayoutFailed` if the provider failed; the balance is
    ///   unchanged
    pub fn withdraw(
        &self,
        ledger: &Ledger,
        payout: &dyn PayoutGateway,
        player_id: &str,
        amount: FixedPoint,
        destination: &str,
    ) -> EconomyResult<WithdrawalReceipt> {
        if amount.is_zero() {
            return Err(EconomyError::InvalidAmount("withdrawal amount must be positive".into()));
        }

        ledger.hold(player_id, amount)?;

        let request = PayoutRequest {
            amount,
            destination: destination.to_string(),
            currency: self.config.currency.clone(),
            reference: format!("wd_{}", Uuid::new_v4().simple()),
        };

        let confirmation = match payout.send(&request) {
            Ok(confirmation) => confirmation,
            Err(error) => {
                ledger.release_hold(player_id, amount)?;
                tracing::warn!(
                    player = player_id,
                    reference = %request.reference,
                    %error,
                    "payout failed; hold released"
                );
                return Err(match error {
                    EconomyError::PayoutFailed(_) => error,
                    other => EconomyError::PayoutFailed(other.to_string()),
                });
            }
        };

        ledger.settle_hold(player_id, amount)?;
        let new_balance = ledger.get_or_create(player_id).real;

        tracing::info!(
            player = player_id,
            reference = %request.reference,
            %amount,
            destination,
            "withdrawal completed"
        );

        Ok(WithdrawalReceipt {
            reference: request.reference,
            player_id: player_id.to_string(),
            amount,
            destination: request.destination,
            confirmation: confirmation.message,
            new_balance,
        })
    }
}
