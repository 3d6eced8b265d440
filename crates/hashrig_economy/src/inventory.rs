//! # Inventory System
//!
//! Ordered, identity-keyed item storage.
//!
//! Unlike stackable materials, every mined rig part is a distinct object with
//! its own UUID: two GPUs of value 4 are still two different items, and only
//! the one named by id may leave the inventory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;

/// Unique identifier for a single item.
pub type ItemId = Uuid;

/// Category of a mined item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    /// Graphics card.
    Gpu,
    /// Application-specific mining chip.
    Asic,
    /// Complete mining rig.
    Rig,
}

impl ItemKind {
    /// Every category, in roll order.
    pub const ALL: [Self; 3] = [Self::Gpu, Self::Asic, Self::Rig];

    /// Picks a category by index, wrapping.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self::ALL[(index % 3) as usize]
    }
}

/// A single owned item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Category.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Cosmetic value, used only for the advisory price estimate.
    pub value: u32,
}

impl Item {
    /// Creates an item with a freshly generated id.
    #[must_use]
    pub fn new(kind: ItemKind, value: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            value,
        }
    }

    /// Estimated real-currency worth at the given per-point rate.
    ///
    /// Advisory only; nothing enforces listing prices against it.
    #[must_use]
    pub fn estimated_worth(&self, rate: FixedPoint) -> FixedPoint {
        rate.checked_mul_int(u64::from(self.value))
            .unwrap_or(FixedPoint::MAX)
    }
}

/// A player's items, in acquisition order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Returns true if the item is held.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Items in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Appends an item.
    pub fn add(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Removes an item by identity and returns it.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemNotFound` if no item has this id, which also
    /// makes a repeated removal of the same id fail.
    pub fn remove(&mut self, id: ItemId) -> EconomyResult<Item> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| EconomyError::ItemNotFound(id.to_string()))?;
        Ok(self.items.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_order() {
        let mut inv = Inventory::new();
        let a = Item::new(ItemKind::Gpu, 3);
        let b = Item::new(ItemKind::Rig, 9);
        inv.add(a.clone());
        inv.add(b.clone());

        let ids: Vec<_> = inv.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_remove_by_identity_not_value() {
        let mut inv = Inventory::new();
        let first = Item::new(ItemKind::Gpu, 4);
        let twin = Item::new(ItemKind::Gpu, 4);
        inv.add(first.clone());
        inv.add(twin.clone());

        let removed = inv.remove(twin.id).unwrap();
        assert_eq!(removed.id, twin.id);
        assert!(inv.contains(first.id));
        assert!(!inv.contains(twin.id));
    }

    #[test]
    fn test_second_remove_fails() {
        let mut inv = Inventory::new();
        let item = Item::new(ItemKind::Asic, 1);
        inv.add(item.clone());

        inv.remove(item.id).unwrap();
        let result = inv.remove(item.id);
        assert!(matches!(result, Err(EconomyError::ItemNotFound(_))));
        assert!(inv.is_empty());
    }

    #[test]
    fn test_estimated_worth() {
        let item = Item::new(ItemKind::Rig, 7);
        let rate: FixedPoint = "0.01".parse().unwrap();
        assert_eq!(item.estimated_worth(rate), "0.07".parse().unwrap());
    }

    #[test]
    fn test_item_json_shape() {
        let item = Item::new(ItemKind::Asic, 2);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "ASIC");
        assert_eq!(json["value"], 2);
    }
}
