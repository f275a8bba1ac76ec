//! Purchase/return engine
//!
//! This module provides the `PurchaseEngine`, which moves money and ownership
//! between the account store and the ownership ledger as single atomic steps.
//!
//! The engine enforces business rules such as:
//! - Unknown items are rejected before anything else is looked at
//! - An item is owned at most once per user
//! - A purchase never overdraws the balance
//! - A debit is never recorded without its ownership record, and vice versa
//!
//! # Transactions
//!
//! Every balance-changing operation is an optimistic transaction: read a
//! snapshot of the user row, validate the request against it and the ledger,
//! then [`commit`](AccountStore::commit) under the row lock if the row version
//! is unchanged. The ledger is only written from inside the commit closure, and
//! every commit bumps the version, so a validation based on stale ownership or
//! a stale balance always ends in a `WriteConflict` and a fresh attempt.
//! Within the closure all fallible steps run before the first write.

use crate::core::{AccountStore, CatalogStore, OwnershipLedger, RetryPolicy, UserIdentity};
use crate::types::{BookstoreError, Item, ItemId, Receipt};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Orchestrates buy, return and deposit against the shared stores
///
/// Cheap to clone; clones share the same stores.
#[derive(Debug, Clone)]
pub struct PurchaseEngine {
    accounts: Arc<AccountStore>,
    catalog: Arc<CatalogStore>,
    ledger: Arc<OwnershipLedger>,
    retry: RetryPolicy,
}

impl PurchaseEngine {
    /// Create a new PurchaseEngine over the given stores
    pub fn new(
        accounts: Arc<AccountStore>,
        catalog: Arc<CatalogStore>,
        ledger: Arc<OwnershipLedger>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            accounts,
            catalog,
            ledger,
            retry,
        }
    }

    /// Buy an item
    ///
    /// Checks, in order: the item exists, the user does not own it yet, the
    /// balance covers the price. Then debits the price and records ownership
    /// in one commit.
    ///
    /// # Errors
    ///
    /// * `ItemNotFound` - the item is not in the catalog
    /// * `AlreadyOwned` - the user already owns the item
    /// * `InsufficientFunds` - the balance is lower than the price
    /// * `Unauthorized` - the user was deleted
    /// * `TransientFailure` - commits kept conflicting; nothing was changed
    pub fn buy(&self, user: &UserIdentity, item: ItemId) -> Result<Receipt, BookstoreError> {
        let user = user.id();
        let item = self
            .catalog
            .get(item)
            .ok_or_else(|| BookstoreError::item_not_found(item))?;

        let receipt = self.retry.run("buy", user, || {
            let snapshot = self
                .accounts
                .snapshot(user)
                .ok_or(BookstoreError::Unauthorized)?;

            if self.ledger.owns(user, item.id) {
                return Err(BookstoreError::already_owned(user, item.id));
            }
            if snapshot.balance < item.price {
                return Err(BookstoreError::insufficient_funds(
                    user,
                    snapshot.balance,
                    item.price,
                ));
            }

            self.accounts.commit(user, snapshot.version, |row| {
                let balance = row
                    .balance
                    .checked_sub(item.price)
                    .ok_or_else(|| BookstoreError::arithmetic_overflow("buy", user))?;
                self.ledger.insert(user, item.id)?;
                row.balance = balance;

                Ok(Receipt {
                    user,
                    item: Some(item.id),
                    amount: item.price,
                    balance,
                })
            })
        })?;

        tracing::info!(
            user,
            item = item.id,
            price = %item.price,
            balance = %receipt.balance,
            "Purchase committed"
        );
        Ok(receipt)
    }

    /// Return an owned item
    ///
    /// Deletes the ownership record and refunds the item's catalog price in
    /// one commit. Prices are immutable, so the refund equals the price paid.
    ///
    /// # Errors
    ///
    /// * `NotOwned` - no ownership record exists (never bought or already returned)
    /// * `Unauthorized` - the user was deleted
    /// * `TransientFailure` - commits kept conflicting; nothing was changed
    pub fn return_item(&self, user: &UserIdentity, item: ItemId) -> Result<Receipt, BookstoreError> {
        let user = user.id();

        let receipt = self.retry.run("return", user, || {
            let snapshot = self
                .accounts
                .snapshot(user)
                .ok_or(BookstoreError::Unauthorized)?;

            if !self.ledger.owns(user, item) {
                return Err(BookstoreError::not_owned(user, item));
            }
            // Ownership implies the item exists; the catalog is never pruned
            let price = self
                .catalog
                .get(item)
                .map(|item| item.price)
                .ok_or_else(|| BookstoreError::item_not_found(item))?;

            self.accounts.commit(user, snapshot.version, |row| {
                let balance = row
                    .balance
                    .checked_add(price)
                    .ok_or_else(|| BookstoreError::arithmetic_overflow("return", user))?;
                self.ledger.remove(user, item)?;
                row.balance = balance;

                Ok(Receipt {
                    user,
                    item: Some(item),
                    amount: price,
                    balance,
                })
            })
        })?;

        tracing::info!(
            user,
            item,
            refund = %receipt.amount,
            balance = %receipt.balance,
            "Return committed"
        );
        Ok(receipt)
    }

    /// Credit cash to a user's balance
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - the amount is zero or negative
    /// * `ArithmeticOverflow` - the balance would overflow
    /// * `Unauthorized` - the user was deleted
    /// * `TransientFailure` - commits kept conflicting; nothing was changed
    pub fn deposit(&self, user: &UserIdentity, amount: Decimal) -> Result<Receipt, BookstoreError> {
        if amount <= Decimal::ZERO {
            return Err(BookstoreError::invalid_amount(amount));
        }
        let user = user.id();

        let receipt = self.retry.run("deposit", user, || {
            let snapshot = self
                .accounts
                .snapshot(user)
                .ok_or(BookstoreError::Unauthorized)?;

            self.accounts.commit(user, snapshot.version, |row| {
                row.balance = row
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| BookstoreError::arithmetic_overflow("deposit", user))?;

                Ok(Receipt {
                    user,
                    item: None,
                    amount,
                    balance: row.balance,
                })
            })
        })?;

        tracing::info!(user, amount = %amount, balance = %receipt.balance, "Deposit committed");
        Ok(receipt)
    }

    /// Current balance of a user
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the user was deleted.
    pub fn get_balance(&self, user: &UserIdentity) -> Result<Decimal, BookstoreError> {
        self.accounts
            .snapshot(user.id())
            .map(|row| row.balance)
            .ok_or(BookstoreError::Unauthorized)
    }

    /// Items a user owns, sorted by ID
    ///
    /// An empty library is an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the user was deleted.
    pub fn list_owned_items(&self, user: &UserIdentity) -> Result<Vec<Item>, BookstoreError> {
        if self.accounts.snapshot(user.id()).is_none() {
            return Err(BookstoreError::Unauthorized);
        }
        Ok(self
            .ledger
            .items_of(user.id())
            .into_iter()
            .filter_map(|item| self.catalog.get(item))
            .collect())
    }

    /// Whole catalog, sorted by ID
    ///
    /// Needs no identity; a concurrent purchase never changes the catalog.
    pub fn list_items(&self) -> Vec<Item> {
        self.catalog.list()
    }
}
