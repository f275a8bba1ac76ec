//! Ownership ledger
//!
//! Records which user owns which item. Ownership is boolean: a (user, item)
//! pair is either present or not, and the per-user `BTreeSet` makes a second
//! insert of the same pair impossible.
//!
//! # Concurrency
//!
//! The ledger itself only guarantees per-user atomicity of single calls. The
//! purchase engine calls the mutating methods exclusively from inside an
//! [`AccountStore::commit`](crate::core::AccountStore::commit) closure, i.e.
//! while the owning user's row is locked, which is what ties ownership changes
//! to balance changes.

use crate::types::{BookstoreError, ItemId, UserId};
use dashmap::DashMap;
use std::collections::BTreeSet;

/// Thread-safe set of (user, item) ownership records
#[derive(Debug, Default)]
pub struct OwnershipLedger {
    owned: DashMap<UserId, BTreeSet<ItemId>>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted (user, item) pairs
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` if a pair appears twice.
    pub fn restore(records: Vec<(UserId, ItemId)>) -> Result<Self, BookstoreError> {
        let ledger = Self::new();
        for (user, item) in records {
            ledger.insert(user, item).map_err(|_| {
                BookstoreError::corrupt_snapshot(format!(
                    "duplicate ownership of item {} by user {}",
                    item, user
                ))
            })?;
        }
        Ok(ledger)
    }

    /// Check whether a user owns an item
    pub fn owns(&self, user: UserId, item: ItemId) -> bool {
        self.owned
            .get(&user)
            .is_some_and(|items| items.contains(&item))
    }

    /// Record that a user owns an item
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOwned` if the record exists; the ledger is unchanged.
    pub fn insert(&self, user: UserId, item: ItemId) -> Result<(), BookstoreError> {
        let mut items = self.owned.entry(user).or_default();
        if items.insert(item) {
            Ok(())
        } else {
            Err(BookstoreError::already_owned(user, item))
        }
    }

    /// Delete an ownership record
    ///
    /// # Errors
    ///
    /// Returns `NotOwned` if the record does not exist; the ledger is unchanged.
    pub fn remove(&self, user: UserId, item: ItemId) -> Result<(), BookstoreError> {
        let removed = self
            .owned
            .get_mut(&user)
            .is_some_and(|mut items| items.remove(&item));

        if removed {
            // Drop the empty set so deleted users leave nothing behind
            self.owned.remove_if(&user, |_, items| items.is_empty());
            Ok(())
        } else {
            Err(BookstoreError::not_owned(user, item))
        }
    }

    /// Items owned by a user, ascending
    pub fn items_of(&self, user: UserId) -> Vec<ItemId> {
        self.owned
            .get(&user)
            .map(|items| items.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Delete every record of a user, returning how many were removed
    pub fn remove_user(&self, user: UserId) -> usize {
        self.owned
            .remove(&user)
            .map(|(_, items)| items.len())
            .unwrap_or(0)
    }

    /// All records as (user, item) pairs, sorted
    pub fn records(&self) -> Vec<(UserId, ItemId)> {
        let mut records: Vec<(UserId, ItemId)> = self
            .owned
            .iter()
            .flat_map(|entry| {
                let user = *entry.key();
                entry
                    .value()
                    .iter()
                    .map(move |item| (user, *item))
                    .collect::<Vec<_>>()
            })
            .collect();
        records.sort_unstable();
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_insert_and_owns() {
        let ledger = OwnershipLedger::new();

        ledger.insert(1, 10).unwrap();

        assert!(ledger.owns(1, 10));
        assert!(!ledger.owns(1, 11));
        assert!(!ledger.owns(2, 10));
    }

    #[test]
    fn test_insert_twice_is_already_owned() {
        let ledger = OwnershipLedger::new();
        ledger.insert(1, 10).unwrap();

        assert_eq!(ledger.insert(1, 10), Err(BookstoreError::already_owned(1, 10)));
        assert_eq!(ledger.records(), vec![(1, 10)]);
    }

    #[test]
    fn test_remove_missing_is_not_owned() {
        let ledger = OwnershipLedger::new();

        assert_eq!(ledger.remove(1, 10), Err(BookstoreError::not_owned(1, 10)));
    }

    #[test]
    fn test_remove_then_reinsert() {
        let ledger = OwnershipLedger::new();
        ledger.insert(1, 10).unwrap();

        ledger.remove(1, 10).unwrap();
        assert!(!ledger.owns(1, 10));
        assert!(ledger.records().is_empty());

        ledger.insert(1, 10).unwrap();
        assert!(ledger.owns(1, 10));
    }

    #[test]
    fn test_items_of_is_sorted() {
        let ledger = OwnershipLedger::new();
        ledger.insert(1, 30).unwrap();
        ledger.insert(1, 10).unwrap();
        ledger.insert(2, 20).unwrap();

        assert_eq!(ledger.items_of(1), vec![10, 30]);
        assert_eq!(ledger.items_of(3), Vec::<ItemId>::new());
    }

    #[test]
    fn test_remove_user() {
        let ledger = OwnershipLedger::new();
        ledger.insert(1, 10).unwrap();
        ledger.insert(1, 20).unwrap();
        ledger.insert(2, 10).unwrap();

        assert_eq!(ledger.remove_user(1), 2);
        assert_eq!(ledger.remove_user(1), 0);
        assert_eq!(ledger.records(), vec![(2, 10)]);
    }

    #[test]
    fn test_concurrent_insert_same_pair_single_winner() {
        let ledger = Arc::new(OwnershipLedger::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.insert(1, 10).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let result = OwnershipLedger::restore(vec![(1, 10), (1, 10)]);

        assert!(matches!(result, Err(BookstoreError::CorruptSnapshot { .. })));
    }
}
