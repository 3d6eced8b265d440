//! # Mining Engine
//!
//! Turns one "mine" action into a coin reward and, sometimes, an item drop.
//!
//! ## Rolls
//!
//! All randomness is integer and goes through [`RandomSource`]:
//!
//! ```text
//! reward = power * roll_bp / 10000        roll_bp in [reward_min_bp, reward_max_bp]
//! drop   = roll < drop_chance_bp          roll in [0, 10000)
//! kind   = ItemKind::ALL[roll]            roll in [0, 3)
//! value  = item_value_min + roll          roll in [0, max - min]
//! ```
//!
//! With the default configuration the reward is `floor(power * U(0.5, 1.5))`
//! at basis-point resolution and 30% of mines drop an item.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use crate::config::MiningConfig;
use crate::error::EconomyResult;
use crate::fixed_point::FixedPoint;
use crate::inventory::{Item, ItemKind};
use crate::ledger::{Amount, Ledger};
use crate::pricing::PricingModel;

/// Source of uniform integers for reward and drop rolls.
///
/// Swap in a scripted source to make mining deterministic in tests.
pub trait RandomSource: Send {
    /// Returns a uniform integer in `[0, bound)`. `bound` is never 0.
    fn next_below(&mut self, bound: u32) -> u32;
}

/// ChaCha20-backed random source.
#[derive(Debug)]
pub struct ChaChaSource(ChaCha20Rng);

impl ChaChaSource {
    /// Seeds from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(ChaCha20Rng::from_entropy())
    }

    /// Seeds deterministically.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl RandomSource for ChaChaSource {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.0.gen_range(0..bound)
    }
}

/// An item produced by a mine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDrop {
    /// The item, already in the player's inventory.
    pub item: Item,
    /// Advisory real-currency worth.
    pub estimated_worth: FixedPoint,
}

/// Result of one mine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningOutcome {
    /// Coins credited.
    pub reward: u64,
    /// Coin balance after the credit.
    pub new_balance: u64,
    /// Mining power used for the roll.
    pub power: u64,
    /// Dropped item, if any.
    pub drop: Option<ItemDrop>,
}

/// Computes mining rewards and drops.
pub struct MiningEngine {
    config: MiningConfig,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl std::fmt::Debug for MiningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MiningEngine {
    /// Creates an engine seeded from the configuration.
    #[must_use]
    pub fn new(config: MiningConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaChaSource::seeded(seed),
            None => ChaChaSource::from_entropy(),
        };
        Self::with_source(config, Box::new(rng))
    }

    /// Creates an engine with an explicit random source.
    #[must_use]
    pub fn with_source(config: MiningConfig, source: Box<dyn RandomSource>) -> Self {
        Self {
            config,
            rng: Mutex::new(source),
        }
    }

    /// Rolls the reward and drop for a given power without touching any account.
    fn roll(&self, power: u64) -> (u64, Option<Item>) {
        let c = &self.config;
        let mut rng = self.rng.lock();

        let spread = c.reward_max_bp - c.reward_min_bp;
        let roll_bp = c.reward_min_bp + rng.next_below(spread.saturating_add(1).max(1));
        let reward = u64::try_from(u128::from(power) * u128::from(roll_bp) / 10_000)
            .unwrap_or(u64::MAX);

        let item = if rng.next_below(10_000) < c.drop_chance_bp {
            let kind = ItemKind::from_index(rng.next_below(3));
            let span = c.item_value_max - c.item_value_min;
            let value = c.item_value_min + rng.next_below(span.saturating_add(1).max(1));
            Some(Item::new(kind, value))
        } else {
            None
        };

        (reward, item)
    }

    /// Mines once for `player_id`.
    ///
    /// Reward and drop are applied in one critical section.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` only if the coin balance
    /// would overflow.
    pub fn mine(
        &self,
        ledger: &Ledger,
        pricing: &PricingModel,
        player_id: &str,
    ) -> EconomyResult<MiningOutcome> {
        ledger.update(player_id, |account| {
            let power = pricing.mining_power(&account.levels);
            let (reward, item) = self.roll(power);

            account.credit(Amount::Coins(reward))?;

            let drop = item.map(|item| {
                let estimated_worth = item.estimated_worth(self.config.item_exchange_rate);
                account.inventory.add(item.clone());
                ItemDrop {
                    item,
                    estimated_worth,
                }
            });

            tracing::debug!(
                player = player_id,
                power,
                reward,
                dropped = drop.is_some(),
                "mined"
            );

            Ok(MiningOutcome {
                reward,
                new_balance: account.coins,
                power,
                drop,
            })
        })
    }
}
