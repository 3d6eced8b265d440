//! # Economy Error Types
//!
//! All errors that can occur in the economy system.
//!
//! Every engine operation is all-or-nothing: when one of these is returned,
//! no balance, level, inventory or listing has changed.

use thiserror::Error;

use crate::fixed_point::FixedPoint;

/// Which balance an operation was working against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Currency {
    /// Progression currency earned by mining.
    Coins,
    /// Withdrawable, externally backed currency.
    Real,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coins => f.write_str("coins"),
            Self::Real => f.write_str("real"),
        }
    }
}

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// The balance cannot cover the requested debit.
    #[error("insufficient {currency} funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Balance that was checked.
        currency: Currency,
        /// Amount required, rendered in the currency's own format.
        required: String,
        /// Amount available, rendered in the currency's own format.
        available: String,
    },

    /// Item is not in the player's inventory.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Listing does not exist (never created or already fulfilled).
    #[error("listing not found: {0}")]
    ListingNotFound(String),

    /// Upgrade kind is not a configured key.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),

    /// Strict lookup of a player that was never referenced.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Amount is zero where a positive value is needed, or failed to parse.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The external payout provider rejected or failed the transfer.
    #[error("payout failed: {0}")]
    PayoutFailed(String),

    /// Arithmetic overflow in economic calculation.
    #[error("arithmetic overflow in economic calculation")]
    ArithmeticOverflow,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EconomyError {
    /// Builds an `InsufficientFunds` error for the coin balance.
    #[must_use]
    pub fn insufficient_coins(required: u64, available: u64) -> Self {
        Self::InsufficientFunds {
            currency: Currency::Coins,
            required: required.to_string(),
            available: available.to_string(),
        }
    }

    /// Builds an `InsufficientFunds` error for the real balance.
    #[must_use]
    pub fn insufficient_real(required: FixedPoint, available: FixedPoint) -> Self {
        Self::InsufficientFunds {
            currency: Currency::Real,
            required: required.to_string(),
            available: available.to_string(),
        }
    }

    /// Stable machine-readable code for API consumers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::ItemNotFound(_) => "item_not_found",
            Self::ListingNotFound(_) => "listing_not_found",
            Self::UnknownUpgrade(_) => "unknown_upgrade",
            Self::UnknownPlayer(_) => "unknown_player",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::PayoutFailed(_) => "payout_failed",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
