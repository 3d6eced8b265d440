//! # Economy Configuration
//!
//! All balance data lives in a TOML file loaded once at startup. Engines read
//! these values; none of them hard-code prices, bonuses or drop rates.
//!
//! ```toml
//! [mining]
//! base_power = 1
//! drop_chance_bp = 3000
//! item_exchange_rate = "0.01"
//!
//! [upgrades.cpu]
//! name = "GPU"
//! base_price = 10
//! multiplier = "1.5"
//! bonus = 2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;

/// Static definition of one upgrade kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    /// Display name.
    pub name: String,
    /// Price of the first purchase, in coins.
    pub base_price: u64,
    /// Price growth per level. Must be at least 1.
    pub multiplier: FixedPoint,
    /// Mining power added per level above 1.
    pub bonus: u64,
}

/// Mining reward and drop parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Power of a player with every upgrade at level 1.
    pub base_power: u64,
    /// Lower bound of the reward roll, in basis points of power.
    pub reward_min_bp: u32,
    /// Upper bound of the reward roll (inclusive), in basis points of power.
    pub reward_max_bp: u32,
    /// Chance of an item drop per mine, in basis points.
    pub drop_chance_bp: u32,
    /// Smallest item value.
    pub item_value_min: u32,
    /// Largest item value (inclusive).
    pub item_value_max: u32,
    /// Real-currency worth of one item value point (advisory).
    pub item_exchange_rate: FixedPoint,
    /// Fixed RNG seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            base_power: 1,
            reward_min_bp: 5_000,
            reward_max_bp: 15_000,
            drop_chance_bp: 3_000,
            item_value_min: 1,
            item_value_max: 10,
            item_exchange_rate: FixedPoint::from_parts(0, 1_000_000),
            seed: None,
        }
    }
}

/// Deposit and payout parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Address players send deposits to.
    pub wallet_address: String,
    /// Leading segment of every payment reference.
    pub reference_prefix: String,
    /// Currency code sent to the payout provider.
    pub currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            wallet_address: "TTestAddress".to_string(),
            reference_prefix: "uid".to_string(),
            currency: "USDT".to_string(),
        }
    }
}

/// Complete economy configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Mining parameters.
    #[serde(default)]
    pub mining: MiningConfig,
    /// Payment parameters.
    #[serde(default)]
    pub payments: PaymentConfig,
    /// Upgrade kinds keyed by their API name.
    pub upgrades: BTreeMap<String, UpgradeDefinition>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        let mut upgrades = BTreeMap::new();
        upgrades.insert(
            "cpu".to_string(),
            UpgradeDefinition {
                name: "GPU".to_string(),
                base_price: 10,
                multiplier: FixedPoint::from_parts(1, 50_000_000),
                bonus: 2,
            },
        );
        upgrades.insert(
            "electricity".to_string(),
            UpgradeDefinition {
                name: "Electricity".to_string(),
                base_price: 50,
                multiplier: FixedPoint::from_parts(1, 80_000_000),
                bonus: 5,
            },
        );

        Self {
            mining: MiningConfig::default(),
            payments: PaymentConfig::default(),
            upgrades,
        }
    }
}

impl EconomyConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` on syntax errors or values that
    /// fail [`EconomyConfig::validate`].
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            EconomyError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` describing the first violation.
    pub fn validate(&self) -> EconomyResult<()> {
        let m = &self.mining;
        if m.reward_min_bp > m.reward_max_bp {
            return Err(EconomyError::InvalidConfig(format!(
                "reward_min_bp {} exceeds reward_max_bp {}",
                m.reward_min_bp, m.reward_max_bp
            )));
        }
        if m.drop_chance_bp > 10_000 {
            return Err(EconomyError::InvalidConfig(format!(
                "drop_chance_bp {} exceeds 10000",
                m.drop_chance_bp
            )));
        }
        if m.item_value_min > m.item_value_max {
            return Err(EconomyError::InvalidConfig(format!(
                "item_value_min {} exceeds item_value_max {}",
                m.item_value_min, m.item_value_max
            )));
        }
        if self.upgrades.is_empty() {
            return Err(EconomyError::InvalidConfig(
                "at least one upgrade must be defined".to_string(),
            ));
        }
        for (kind, def) in &self.upgrades {
            if def.multiplier < FixedPoint::ONE {
                return Err(EconomyError::InvalidConfig(format!(
                    "upgrade {kind}: multiplier {} is below 1",
                    def.multiplier
                )));
            }
        }
        Ok(())
    }
}
