//! # Market
//!
//! Player-to-player item trading, priced in real currency.
//!
//! ## Escrow
//!
//! Listing an item moves it out of the seller's inventory and into the
//! listing. At every moment an item is owned by exactly one of the two.
//!
//! ## Exactly-once fulfillment
//!
//! ```text
//! market lock ──> find listing ──> ledger.update_pair(buyer, seller)
//!                                       debit buyer, credit seller, give item
//!                                  ──> remove listing (only on success)
//! ```
//!
//! The market lock is held across the whole sequence, so a listing is checked
//! and removed as one step: of two concurrent buyers, one succeeds and the
//! other sees `ListingNotFound`. The lock order is always market, then
//! accounts.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;
use crate::inventory::{Item, ItemId};
use crate::ledger::{Amount, Ledger, Parties, PlayerId};

/// Unique identifier for a listing.
pub type ListingId = Uuid;

/// An open offer to sell one escrowed item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Listing id.
    pub id: ListingId,
    /// Seller's player id.
    pub seller_id: PlayerId,
    /// The escrowed item.
    pub item: Item,
    /// Asking price in real currency.
    pub price: FixedPoint,
    /// Creation time, unix milliseconds.
    pub timestamp: u64,
}

/// Result of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// The fulfilled listing.
    pub listing: Listing,
    /// Buyer's real balance after paying.
    pub buyer_balance: FixedPoint,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Open listings in creation order.
#[derive(Debug, Default)]
pub struct Market {
    listings: Mutex<Vec<Listing>>,
}

impl Market {
    /// Creates an empty market.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Escrows an item from the seller's inventory into a new listing.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemNotFound` if the seller does not hold the item.
    pub fn list_item(
        &self,
        ledger: &Ledger,
        seller_id: &str,
        item_id: ItemId,
        price: FixedPoint,
    ) -> EconomyResult<Listing> {
        let mut listings = self.listings.lock();
        let item = ledger.remove_item(seller_id, item_id)?;

        let listing = Listing {
            id: Uuid::new_v4(),
            seller_id: seller_id.to_string(),
            item,
            price,
            timestamp: now_millis(),
        };
        listings.push(listing.clone());

        tracing::info!(
            seller = seller_id,
            listing = %listing.id,
            item = %item_id,
            price = %price,
            "item listed"
        );
        Ok(listing)
    }

    /// Buys a listing: pays the seller, hands the item to the buyer.
    ///
    /// A seller may buy their own listing; the payment nets to zero and the
    /// item returns to their inventory.
    ///
    /// # Errors
    ///
    /// - `EconomyError::ListingNotFound` if the listing is gone or never existed
    /// - `EconomyError::InsufficientFunds` if the buyer cannot pay (the listing
    ///   stays open)
    pub fn fulfill_listing(
        &self,
        ledger: &Ledger,
        buyer_id: &str,
        listing_id: ListingId,
    ) -> EconomyResult<Purchase> {
        let mut listings = self.listings.lock();
        let index = listings
            .iter()
            .position(|l| l.id == listing_id)
            .ok_or_else(|| EconomyError::ListingNotFound(listing_id.to_string()))?;

        let listing = &listings[index];
        let price = Amount::Real(listing.price);
        let item = listing.item.clone();

        let buyer_balance = ledger.update_pair(buyer_id, &listing.seller_id, |parties| {
            match parties {
                Parties::Same(account) => {
                    account.ensure_covers(price)?;
                    account.inventory.add(item);
                    Ok(account.real)
                }
                Parties::Distinct(buyer, seller) => {
                    buyer.debit(price)?;
                    seller.credit(price)?;
                    buyer.inventory.add(item);
                    Ok(buyer.real)
                }
            }
        })?;

        let listing = listings.remove(index);
        tracing::info!(
            buyer = buyer_id,
            seller = %listing.seller_id,
            listing = %listing.id,
            price = %listing.price,
            "listing fulfilled"
        );

        Ok(Purchase {
            listing,
            buyer_balance,
        })
    }

    /// Open listings in creation order.
    #[must_use]
    pub fn list_all(&self) -> Vec<Listing> {
        self.listings.lock().clone()
    }

    /// Number of open listings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.lock().len()
    }

    /// Returns true if nothing is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.lock().is_empty()
    }
}
