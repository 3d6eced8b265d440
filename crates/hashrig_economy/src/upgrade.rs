//! # Upgrade Engine
//!
//! Spends coins on one level of an upgrade.
//!
//! Price check, debit and level increment run in the player's critical
//! section, so two concurrent purchases against a balance that covers only
//! one of them cannot both succeed.

use serde::Serialize;

use crate::error::{EconomyError, EconomyResult};
use crate::ledger::{Amount, Ledger};
use crate::pricing::PricingModel;

/// Result of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReceipt {
    /// Upgrade kind purchased.
    pub kind: String,
    /// Coins spent.
    pub cost: u64,
    /// Level after the purchase.
    pub new_level: u32,
    /// Coin balance after the purchase.
    pub new_balance: u64,
    /// Price of the following level.
    pub next_cost: u64,
}

/// Buys one level of `kind` for `player_id`.
///
/// # Errors
///
/// - `EconomyError::UnknownUpgrade` if `kind` is not configured
/// - `EconomyError::InsufficientFunds` if the coin balance is below the price
///
/// Neither error changes any state.
pub fn upgrade(
    ledger: &Ledger,
    pricing: &PricingModel,
    player_id: &str,
    kind: &str,
) -> EconomyResult<UpgradeReceipt> {
    // Fail before touching the ledger so unknown kinds do not create accounts.
    pricing.definition(kind)?;

    let receipt = ledger.update(player_id, |account| {
        let level = account.level(kind);
        let cost = pricing.upgrade_cost(kind, level)?;

        account.debit(Amount::Coins(cost))?;
        let new_level = level.checked_add(1).ok_or(EconomyError::ArithmeticOverflow)?;
        account.levels.insert(kind.to_string(), new_level);

        Ok(UpgradeReceipt {
            kind: kind.to_string(),
            cost,
            new_level,
            new_balance: account.coins,
            next_cost: pricing.upgrade_cost(kind, new_level)?,
        })
    })?;

    tracing::info!(
        player = player_id,
        kind,
        cost = receipt.cost,
        level = receipt.new_level,
        "upgrade purchased"
    );
    Ok(receipt)
}
