//! # Integration API
//!
//! **The single owner of economic state.** Every request handler goes through
//! [`GameEconomy`]; nothing else holds a ledger, market or deposit book.
//!
//! ```text
//! HTTP handler ──> GameEconomy ──┬──> PricingModel   (read-only)
//!                                ├──> MiningEngine ──┐
//!                                ├──> upgrade() ─────┤
//!                                ├──> Market ────────┼──> Arc<Ledger>
//!                                └──> PaymentBridge ─┘
//! ```
//!
//! ## Lock Order
//!
//! market or deposit book, then account(s), then the mining RNG. No path
//! takes them in the other direction.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::EconomyConfig;
use crate::error::EconomyResult;
use crate::fixed_point::FixedPoint;
use crate::inventory::{Inventory, ItemId};
use crate::ledger::{Ledger, PlayerId};
use crate::market::{Listing, ListingId, Market, Purchase};
use crate::mining::{MiningEngine, MiningOutcome, RandomSource};
use crate::payment::{
    DepositTicket, NotificationOutcome, PaymentBridge, PaymentNotification, PayoutGateway,
    PendingDeposit, WithdrawalReceipt,
};
use crate::pricing::{Levels, PricingModel};
use crate::upgrade::{self, UpgradeReceipt};

// ============================================================================
// Public Types
// ============================================================================

/// Everything a client shows for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Player id.
    pub id: PlayerId,
    /// Progression balance.
    pub coins: u64,
    /// Spendable real balance.
    pub real_balance: FixedPoint,
    /// Real funds reserved by in-flight withdrawals.
    pub held_balance: FixedPoint,
    /// Upgrade levels.
    pub levels: Levels,
    /// Owned items.
    pub inventory: Inventory,
    /// Mining power at the current levels.
    pub current_power: u64,
    /// Price of the next level of every upgrade.
    pub upgrade_prices: std::collections::BTreeMap<String, u64>,
}

// ============================================================================
// GameEconomy
// ============================================================================

/// The game economy: all engines over one shared ledger.
///
/// `Send + Sync`; wrap in an `Arc` and share across request handlers.
#[derive(Debug)]
pub struct GameEconomy {
    config: EconomyConfig,
    pricing: PricingModel,
    ledger: Arc<Ledger>,
    mining: MiningEngine,
    market: Market,
    payments: PaymentBridge,
}

impl GameEconomy {
    /// Builds an economy from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the configuration is inconsistent.
    pub fn new(config: EconomyConfig) -> EconomyResult<Self> {
        config.validate()?;
        let mining = MiningEngine::new(config.mining.clone());
        Ok(Self::assemble(config, mining))
    }

    /// Builds an economy with an explicit mining random source.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the configuration is inconsistent.
    pub fn with_random_source(
        config: EconomyConfig,
        source: Box<dyn RandomSource>,
    ) -> EconomyResult<Self> {
        config.validate()?;
        let mining = MiningEngine::with_source(config.mining.clone(), source);
        Ok(Self::assemble(config, mining))
    }

    /// Loads the configuration from a TOML file and builds the economy.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the file cannot be read, parsed
    /// or validated.
    pub fn from_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        Self::new(EconomyConfig::from_file(path)?)
    }

    fn assemble(config: EconomyConfig, mining: MiningEngine) -> Self {
        let pricing = PricingModel::new(&config);
        let ledger = Arc::new(Ledger::new(pricing.starting_levels()));
        tracing::info!(
            upgrades = config.upgrades.len(),
            drop_chance_bp = config.mining.drop_chance_bp,
            wallet = %config.payments.wallet_address,
            "economy initialized"
        );

        Self {
            payments: PaymentBridge::new(config.payments.clone()),
            market: Market::new(),
            config,
            pricing,
            ledger,
            mining,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Pricing model.
    #[must_use]
    pub fn pricing(&self) -> &PricingModel {
        &self.pricing
    }

    /// Shared ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Returns the player's view, creating the account on first touch.
    #[must_use]
    pub fn player_view(&self, player_id: &str) -> PlayerView {
        let account = self.ledger.get_or_create(player_id);
        PlayerView {
            current_power: self.pricing.mining_power(&account.levels),
            upgrade_prices: self.pricing.quote(&account.levels),
            id: account.id,
            coins: account.coins,
            real_balance: account.real,
            held_balance: account.held,
            levels: account.levels,
            inventory: account.inventory,
        }
    }

    // ========================================================================
    // Progression
    // ========================================================================

    /// Mines once.
    ///
    /// # Errors
    ///
    /// Only `EconomyError::ArithmeticOverflow` on a saturated coin balance.
    pub fn mine(&self, player_id: &str) -> EconomyResult<MiningOutcome> {
        self.mining.mine(&self.ledger, &self.pricing, player_id)
    }

    /// Buys one level of an upgrade.
    ///
    /// # Errors
    ///
    /// `EconomyError::UnknownUpgrade` or `EconomyError::InsufficientFunds`.
    pub fn upgrade(&self, player_id: &str, kind: &str) -> EconomyResult<UpgradeReceipt> {
        upgrade::upgrade(&self.ledger, &self.pricing, player_id, kind)
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Announces a deposit.
    ///
    /// # Errors
    ///
    /// `EconomyError::InvalidAmount` for a zero amount.
    pub fn create_deposit(&self, player_id: &str, amount: FixedPoint) -> EconomyResult<DepositTicket> {
        self.payments.create_deposit(player_id, amount)
    }

    /// Handles a provider callback. Never fails.
    pub fn on_payment_notification(&self, notification: &PaymentNotification) -> NotificationOutcome {
        self.payments.on_payment_notification(&self.ledger, notification)
    }

    /// Looks up a deposit by reference.
    #[must_use]
    pub fn deposit_status(&self, reference: &str) -> Option<PendingDeposit> {
        self.payments.deposit(reference)
    }

    /// Pays real currency out through `payout`. Blocks for the provider call.
    ///
    /// # Errors
    ///
    /// `EconomyError::InvalidAmount`, `EconomyError::InsufficientFunds` or
    /// `EconomyError::PayoutFailed`; none of them changes the balance.
    pub fn withdraw(
        &self,
        payout: &dyn PayoutGateway,
        player_id: &str,
        amount: FixedPoint,
        destination: &str,
    ) -> EconomyResult<WithdrawalReceipt> {
        self.payments
            .withdraw(&self.ledger, payout, player_id, amount, destination)
    }

    // ========================================================================
    // Market
    // ========================================================================

    /// Lists an item for sale.
    ///
    /// # Errors
    ///
    /// `EconomyError::ItemNotFound` if the seller does not hold the item.
    pub fn list_item(&self, seller_id: &str, item_id: ItemId, price: FixedPoint) -> EconomyResult<Listing> {
        self.market.list_item(&self.ledger, seller_id, item_id, price)
    }

    /// Buys a listing.
    ///
    /// # Errors
    ///
    /// `EconomyError::ListingNotFound` or `EconomyError::InsufficientFunds`.
    pub fn fulfill_listing(&self, buyer_id: &str, listing_id: ListingId) -> EconomyResult<Purchase> {
        self.market.fulfill_listing(&self.ledger, buyer_id, listing_id)
    }

    /// Open listings in creation order.
    #[must_use]
    pub fn listings(&self) -> Vec<Listing> {
        self.market.list_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EconomyError;
    use crate::ledger::Amount;
    use crate::mining::tests::ScriptedSource;

    fn economy(rolls: &[u32]) -> GameEconomy {
        GameEconomy::with_random_source(
            EconomyConfig::default(),
            Box::new(ScriptedSource::new(rolls)),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_player_view() {
        let economy = economy(&[]);
        let view = economy.player_view("alice");

        assert_eq!(view.coins, 0);
        assert_eq!(view.real_balance, FixedPoint::ZERO);
        assert_eq!(view.current_power, 1);
        assert_eq!(view.levels["cpu"], 1);
        assert_eq!(view.levels["electricity"], 1);
        assert_eq!(view.upgrade_prices["cpu"], 10);
        assert_eq!(view.upgrade_prices["electricity"], 50);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EconomyConfig::default();
        config.mining.drop_chance_bp = 10_001;
        assert!(matches!(
            GameEconomy::new(config),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_mine_upgrade_and_view_agree() {
        // Three mines at power 1, max roll, no drop: 3 coins. Not enough for cpu.
        let economy = economy(&[10_000, 9_999, 10_000, 9_999, 10_000, 9_999]);
        for _ in 0..3 {
            economy.mine("alice").unwrap();
        }
        assert_eq!(economy.player_view("alice").coins, 3);
        assert!(economy.upgrade("alice", "cpu").is_err());

        economy.ledger().credit("alice", Amount::Coins(7)).unwrap();
        let receipt = economy.upgrade("alice", "cpu").unwrap();
        let view = economy.player_view("alice");
        assert_eq!(receipt.cost, 10);
        assert_eq!(view.current_power, 3);
        assert_eq!(view.upgrade_prices["cpu"], receipt.next_cost);
    }

    #[test]
    fn test_mined_item_can_be_sold_and_bought() {
        // Drop a GPU worth 5 on the first mine.
        let economy = economy(&[0, 0, 0, 4]);
        let drop = economy.mine("miner").unwrap().drop.unwrap();

        let listing = economy
            .list_item("miner", drop.item.id, "0.5".parse().unwrap())
            .unwrap();
        assert_eq!(economy.listings(), vec![listing.clone()]);
        assert!(economy.player_view("miner").inventory.is_empty());

        let ticket = economy.create_deposit("buyer", "1".parse().unwrap()).unwrap();
        economy.on_payment_notification(
            &PaymentNotification::new()
                .with("custom", ticket.reference.clone())
                .with("amount", "1"),
        );
        assert_eq!(
            economy.deposit_status(&ticket.reference).unwrap().credited,
            Some("1".parse().unwrap())
        );

        let purchase = economy.fulfill_listing("buyer", listing.id).unwrap();
        assert_eq!(purchase.buyer_balance, "0.5".parse().unwrap());
        assert_eq!(economy.player_view("miner").real_balance, "0.5".parse().unwrap());
        assert!(economy.player_view("buyer").inventory.contains(drop.item.id));
        assert!(economy.listings().is_empty());
    }
}
