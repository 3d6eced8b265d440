//! # HASHRIG Economy System
//!
//! Pure Rust economic logic for the HASHRIG mining game.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - Real currency is fixed-point (u64 with 8 implicit decimals), coins are u64
//! 2. **All-or-nothing** - Every engine operation either fully applies or changes nothing
//! 3. **Conservation** - Money and items only enter or leave through mining, deposits and withdrawals
//! 4. **External configuration** - All balance data in TOML files
//!
//! ## Thread Safety
//!
//! [`GameEconomy`] is `Send + Sync`. Each player's account has its own lock;
//! two-player operations take both in ascending id order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hashrig_economy::{EconomyConfig, GameEconomy};
//!
//! let economy = GameEconomy::new(EconomyConfig::from_file("config/economy.toml")?)?;
//!
//! let outcome = economy.mine("player-1")?;
//! if outcome.new_balance >= economy.player_view("player-1").upgrade_prices["cpu"] {
//!     economy.upgrade("player-1", "cpu")?;
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod fixed_point;
pub mod inventory;
pub mod ledger;
pub mod market;
pub mod mining;
pub mod payment;
pub mod pricing;
pub mod upgrade;

pub use config::{EconomyConfig, MiningConfig, PaymentConfig, UpgradeDefinition};
pub use error::{Currency, EconomyError, EconomyResult};
pub use fixed_point::FixedPoint;
pub use inventory::{Inventory, Item, ItemId, ItemKind};
pub use ledger::{Account, Amount, Ledger, Parties, PlayerId};
pub use market::{Listing, ListingId, Market, Purchase};
pub use mining::{ChaChaSource, ItemDrop, MiningEngine, MiningOutcome, RandomSource};
pub use payment::{
    DepositStatus, DepositTicket, NotificationOutcome, PaymentBridge, PaymentNotification,
    PayoutConfirmation, PayoutGateway, PayoutRequest, PendingDeposit, WithdrawalReceipt,
};
pub use pricing::{Levels, PricingModel};
pub use upgrade::UpgradeReceipt;
pub mod integration;

pub use integration::{GameEconomy, PlayerView};
