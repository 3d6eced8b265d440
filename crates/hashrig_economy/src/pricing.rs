//! # Pricing Model
//!
//! Pure functions from a player's upgrade levels to prices and mining power.
//!
//! Both the price quote shown to the client and the upgrade purchase call
//! [`PricingModel::upgrade_cost`], so the two can never disagree.
//!
//! ```text
//! cost(kind, level) = floor(base_price * multiplier^(level - 1))
//! power(levels)     = base_power + sum((level_k - 1) * bonus_k)
//! ```

use std::collections::BTreeMap;

use crate::config::{EconomyConfig, UpgradeDefinition};
use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;

/// Upgrade level per kind. Missing kinds count as level 1.
pub type Levels = BTreeMap<String, u32>;

/// Scale of `FixedPoint::raw`, used for the multiplier product.
const RAW_SCALE: u128 = 100_000_000;

/// Extra digits carried below the raw scale while compounding.
///
/// `u64::MAX * GUARD * RAW_SCALE` must fit in a u128.
const GUARD: u128 = 10_000_000_000;

/// Upgrade pricing and mining power, built from configuration.
#[derive(Clone, Debug)]
pub struct PricingModel {
    upgrades: BTreeMap<String, UpgradeDefinition>,
    base_power: u64,
}

impl PricingModel {
    /// Creates a pricing model from the economy configuration.
    #[must_use]
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            upgrades: config.upgrades.clone(),
            base_power: config.mining.base_power,
        }
    }

    /// Looks up an upgrade definition.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownUpgrade` if `kind` is not configured.
    pub fn definition(&self, kind: &str) -> EconomyResult<&UpgradeDefinition> {
        self.upgrades
            .get(kind)
            .ok_or_else(|| EconomyError::UnknownUpgrade(kind.to_string()))
    }

    /// Configured upgrade kinds, in key order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.upgrades.keys().map(String::as_str)
    }

    /// Levels of a fresh account: every configured kind at 1.
    #[must_use]
    pub fn starting_levels(&self) -> Levels {
        self.upgrades.keys().map(|k| (k.clone(), 1)).collect()
    }

    /// Price of the next purchase of `kind` at `current_level`, to 8 decimals.
    ///
    /// Saturates at [`FixedPoint::MAX`] rather than overflowing.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownUpgrade` if `kind` is not configured.
    pub fn upgrade_cost_precise(&self, kind: &str, current_level: u32) -> EconomyResult<FixedPoint> {
        let def = self.definition(kind)?;
        let steps = current_level.max(1) - 1;
        let multiplier = u128::from(def.multiplier.raw());

        let ceiling = u128::from(u64::MAX) * GUARD;

        let mut scaled = u128::from(def.base_price) * RAW_SCALE * GUARD;
        for _ in 0..steps {
            match scaled.checked_mul(multiplier) {
                Some(product) => scaled = product / RAW_SCALE,
                None => return Ok(FixedPoint::MAX),
            }
            if scaled > ceiling {
                return Ok(FixedPoint::MAX);
            }
        }

        Ok(u64::try_from(scaled / GUARD).map_or(FixedPoint::MAX, FixedPoint::from_raw))
    }

    /// Price in coins of the next purchase of `kind` at `current_level`.
    ///
    /// This is the floor of [`PricingModel::upgrade_cost_precise`].
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownUpgrade` if `kind` is not configured.
    pub fn upgrade_cost(&self, kind: &str, current_level: u32) -> EconomyResult<u64> {
        self.upgrade_cost_precise(kind, current_level)
            .map(FixedPoint::whole)
    }

    /// Mining power for a set of levels.
    ///
    /// Non-decreasing in every level. Kinds absent from `levels` count as 1;
    /// kinds absent from configuration contribute nothing.
    #[must_use]
    pub fn mining_power(&self, levels: &Levels) -> u64 {
        self.upgrades.iter().fold(self.base_power, |power, (kind, def)| {
            let level = levels.get(kind).copied().unwrap_or(1).max(1);
            power.saturating_add(u64::from(level - 1).saturating_mul(def.bonus))
        })
    }

    /// Current price of every configured upgrade.
    #[must_use]
    pub fn quote(&self, levels: &Levels) -> BTreeMap<String, u64> {
        self.upgrades
            .keys()
            .map(|kind| {
                let level = levels.get(kind).copied().unwrap_or(1);
                let cost = self.upgrade_cost(kind, level).unwrap_or(u64::MAX);
                (kind.clone(), cost)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> PricingModel {
        PricingModel::new(&EconomyConfig::default())
    }

    fn levels(cpu: u32, electricity: u32) -> Levels {
        let mut l = Levels::new();
        l.insert("cpu".into(), cpu);
        l.insert("electricity".into(), electricity);
        l
    }

    #[test]
    fn test_first_purchase_costs_base_price() {
        let m = model();
        assert_eq!(m.upgrade_cost("cpu", 1).unwrap(), 10);
        assert_eq!(m.upgrade_cost("electricity", 1).unwrap(), 50);
    }

    #[test]
    fn test_geometric_growth() {
        let m = model();
        // 10 * 1.5^n
        assert_eq!(m.upgrade_cost("cpu", 2).unwrap(), 15);
        assert_eq!(m.upgrade_cost("cpu", 3).unwrap(), 22);
        assert_eq!(m.upgrade_cost("cpu", 4).unwrap(), 33);
        assert_eq!(m.upgrade_cost("cpu", 5).unwrap(), 50);
        // 50 * 1.8 = 90, 50 * 3.24 = 162
        assert_eq!(m.upgrade_cost("electricity", 2).unwrap(), 90);
        assert_eq!(m.upgrade_cost("electricity", 3).unwrap(), 162);
    }

    #[test]
    fn test_precise_cost_keeps_fraction() {
        let m = model();
        assert_eq!(
            m.upgrade_cost_precise("cpu", 3).unwrap(),
            FixedPoint::from_parts(22, 50_000_000)
        );
    }

    #[test]
    fn test_cost_monotonic_and_saturating() {
        let m = model();
        let mut previous = 0;
        for level in 1..200 {
            let cost = m.upgrade_cost("electricity", level).unwrap();
            assert!(cost >= previous, "cost dropped at level {level}");
            previous = cost;
        }
        assert_eq!(
            m.upgrade_cost_precise("electricity", 199).unwrap(),
            FixedPoint::MAX
        );
    }

    #[test]
    fn test_high_level_cost_does_not_drift() {
        let m = model();
        // floor(10 * 1.5^(L-1)), exact
        assert_eq!(m.upgrade_cost("cpu", 54).unwrap(), 21_519_725_632);
        assert_eq!(m.upgrade_cost("cpu", 55).unwrap(), 32_279_588_448);
        assert_eq!(m.upgrade_cost("cpu", 58).unwrap(), 108_943_611_013);
    }

    #[test]
    fn test_unknown_upgrade() {
        assert_eq!(
            model().upgrade_cost("turbo", 1),
            Err(EconomyError::UnknownUpgrade("turbo".into()))
        );
    }

    #[test]
    fn test_mining_power_formula() {
        let m = model();
        assert_eq!(m.mining_power(&levels(1, 1)), 1);
        assert_eq!(m.mining_power(&levels(2, 1)), 3);
        assert_eq!(m.mining_power(&levels(1, 2)), 6);
        assert_eq!(m.mining_power(&levels(4, 3)), 1 + 3 * 2 + 2 * 5);
        assert_eq!(m.mining_power(&Levels::new()), 1);
    }

    #[test]
    fn test_quote_matches_cost() {
        let m = model();
        let quote = m.quote(&levels(3, 2));
        assert_eq!(quote["cpu"], m.upgrade_cost("cpu", 3).unwrap());
        assert_eq!(quote["electricity"], m.upgrade_cost("electricity", 2).unwrap());
    }
}
