//! # Ledger
//!
//! Owns every player's balances, levels and inventory.
//!
//! ## Locking
//!
//! ```text
//! RwLock<HashMap<PlayerId, Arc<Mutex<Account>>>>
//!   read lock  -> find the account handle (fast path)
//!   write lock -> insert a new account (first touch only)
//!   Mutex      -> the per-player critical section
//! ```
//!
//! The map lock is never held while an account lock is taken. Operations on
//! two accounts lock them in ascending id order, so two transfers in opposite
//! directions cannot deadlock.
//!
//! ## All-or-nothing
//!
//! [`Ledger::update`] and [`Ledger::update_pair`] snapshot the account(s)
//! before running the caller's closure and restore the snapshot if the closure
//! returns an error. Engines compose multi-step mutations (check, debit, level
//! up) inside one closure and get rollback for free.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::FixedPoint;
use crate::inventory::{Inventory, Item, ItemId};
use crate::pricing::Levels;

/// Opaque player identifier, supplied by the caller and never validated.
pub type PlayerId = String;

/// A quantity of one of the two currencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Amount {
    /// Progression currency.
    Coins(u64),
    /// Real currency.
    Real(FixedPoint),
}

/// One player's state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Player id.
    pub id: PlayerId,
    /// Progression balance.
    pub coins: u64,
    /// Spendable real balance.
    pub real: FixedPoint,
    /// Real funds reserved by in-flight withdrawals.
    pub held: FixedPoint,
    /// Upgrade levels.
    pub levels: Levels,
    /// Owned items.
    pub inventory: Inventory,
}

impl Account {
    fn new(id: PlayerId, levels: Levels) -> Self {
        Self {
            id,
            coins: 0,
            real: FixedPoint::ZERO,
            held: FixedPoint::ZERO,
            levels,
            inventory: Inventory::new(),
        }
    }

    /// Current level of an upgrade kind (1 if never purchased).
    #[must_use]
    pub fn level(&self, kind: &str) -> u32 {
        self.levels.get(kind).copied().unwrap_or(1)
    }

    /// Increases a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the balance would overflow.
    pub fn credit(&mut self, amount: Amount) -> EconomyResult<()> {
        match amount {
            Amount::Coins(n) => {
                self.coins = self.coins.checked_add(n).ok_or(EconomyError::ArithmeticOverflow)?;
            }
            Amount::Real(v) => self.real = self.real.safe_add(v)?,
        }
        Ok(())
    }

    /// Fails unless the balance covers `amount`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds`.
    pub fn ensure_covers(&self, amount: Amount) -> EconomyResult<()> {
        match amount {
            Amount::Coins(n) if n > self.coins => {
                Err(EconomyError::insufficient_coins(n, self.coins))
            }
            Amount::Real(v) if v > self.real => Err(EconomyError::insufficient_real(v, self.real)),
            _ => Ok(()),
        }
    }

    /// Decreases a balance. Never drives it below zero.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` if `amount` exceeds the balance.
    pub fn debit(&mut self, amount: Amount) -> EconomyResult<()> {
        self.ensure_covers(amount)?;
        match amount {
            Amount::Coins(n) => self.coins -= n,
            Amount::Real(v) => self.real -= v,
        }
        Ok(())
    }
}

/// The two sides of a two-account operation.
#[derive(Debug)]
pub enum Parties<'a> {
    /// Both ids named the same player.
    Same(&'a mut Account),
    /// Two distinct players, in the order the caller passed them.
    Distinct(&'a mut Account, &'a mut Account),
}

/// The process-wide account store.
#[derive(Debug)]
pub struct Ledger {
    accounts: RwLock<HashMap<PlayerId, Arc<Mutex<Account>>>>,
    starting_levels: Levels,
}

impl Ledger {
    /// Creates an empty ledger. New accounts start at `starting_levels`.
    #[must_use]
    pub fn new(starting_levels: Levels) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            starting_levels,
        }
    }

    fn handle(&self, id: &str) -> Arc<Mutex<Account>> {
        if let Some(account) = self.accounts.read().get(id) {
            return Arc::clone(account);
        }

        let mut accounts = self.accounts.write();
        let account = accounts.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(player = id, "creating account");
            Arc::new(Mutex::new(Account::new(
                id.to_string(),
                self.starting_levels.clone(),
            )))
        });
        Arc::clone(account)
    }

    /// Returns the account for `id`, creating it on first touch.
    pub fn get_or_create(&self, id: &str) -> Account {
        self.handle(id).lock().clone()
    }

    /// Returns the account for `id` without creating it.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownPlayer` if the id was never referenced.
    pub fn snapshot(&self, id: &str) -> EconomyResult<Account> {
        let handle = self
            .accounts
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EconomyError::UnknownPlayer(id.to_string()))?;
        let account = handle.lock().clone();
        Ok(account)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Returns true if no player has been referenced yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Sum of all real balances including held funds.
    #[must_use]
    pub fn total_real(&self) -> FixedPoint {
        let handles: Vec<_> = self.accounts.read().values().cloned().collect();
        handles.iter().fold(FixedPoint::ZERO, |sum, handle| {
            let account = handle.lock();
            sum + account.real + account.held
        })
    }

    /// Runs `f` inside the player's critical section.
    ///
    /// If `f` fails, the account is restored to its state before the call.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Account) -> EconomyResult<T>,
    ) -> EconomyResult<T> {
        let handle = self.handle(id);
        let mut account = handle.lock();
        let snapshot = account.clone();
        let result = f(&mut *account);
        if result.is_err() {
            *account = snapshot;
        }
        result
    }

    /// Runs `f` with both players' critical sections held.
    ///
    /// Locks are taken in ascending id order. If `a == b` the closure receives
    /// [`Parties::Same`]. On failure both accounts are restored.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn update_pair<T>(
        &self,
        a: &str,
        b: &str,
        f: impl FnOnce(Parties<'_>) -> EconomyResult<T>,
    ) -> EconomyResult<T> {
        if a == b {
            return self.update(a, |account| f(Parties::Same(account)));
        }

        let handle_a = self.handle(a);
        let handle_b = self.handle(b);
        let a_first = a < b;

        let (mut first, mut second) = if a_first {
            let first = handle_a.lock();
            (first, handle_b.lock())
        } else {
            let first = handle_b.lock();
            (first, handle_a.lock())
        };

        let (account_a, account_b) = if a_first {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };

        let snapshot_a = account_a.clone();
        let snapshot_b = account_b.clone();
        let result = f(Parties::Distinct(&mut *account_a, &mut *account_b));
        if result.is_err() {
            *account_a = snapshot_a;
            *account_b = snapshot_b;
        }
        result
    }

    /// Increases a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the balance would overflow.
    pub fn credit(&self, id: &str, amount: Amount) -> EconomyResult<()> {
        self.update(id, |account| account.credit(amount))
    }

    /// Decreases a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` if `amount` exceeds the balance.
    pub fn debit(&self, id: &str, amount: Amount) -> EconomyResult<()> {
        self.update(id, |account| account.debit(amount))
    }

    /// Appends an item to the player's inventory.
    pub fn add_item(&self, id: &str, item: Item) {
        self.handle(id).lock().inventory.add(item);
    }

    /// Removes an item from the player's inventory by identity.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemNotFound` if the player does not hold it.
    pub fn remove_item(&self, id: &str, item_id: ItemId) -> EconomyResult<Item> {
        self.update(id, |account| account.inventory.remove(item_id))
    }

    /// Moves `amount` from one player to another.
    ///
    /// The debit happens first; if it fails nothing is credited. A transfer to
    /// self checks funds and leaves the balance unchanged.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` if `from` cannot cover `amount`.
    pub fn transfer(&self, from: &str, to: &str, amount: Amount) -> EconomyResult<()> {
        self.update_pair(from, to, |parties| match parties {
            Parties::Same(account) => account.ensure_covers(amount),
            Parties::Distinct(payer, payee) => {
                payer.debit(amount)?;
                payee.credit(amount)
            }
        })
    }

    /// Moves real funds from the spendable balance into the withdrawal hold.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` if the spendable balance is short.
    pub fn hold(&self, id: &str, amount: FixedPoint) -> EconomyResult<()> {
        self.update(id, |account| {
            account.debit(Amount::Real(amount))?;
            account.held = account.held.safe_add(amount)?;
            Ok(())
        })
    }

    /// Finalizes a held amount: the funds leave the ledger.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if less than `amount` is held.
    pub fn settle_hold(&self, id: &str, amount: FixedPoint) -> EconomyResult<()> {
        self.update(id, |account| {
            account.held = account.held.safe_sub(amount)?;
            Ok(())
        })
    }

    /// Returns a held amount to the spendable balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if less than `amount` is held.
    pub fn release_hold(&self, id: &str, amount: FixedPoint) -> EconomyResult<()> {
        self.update(id, |account| {
            account.held = account.held.safe_sub(amount)?;
            account.real = account.real.safe_add(amount)?;
            Ok(())
        })
    }
}
