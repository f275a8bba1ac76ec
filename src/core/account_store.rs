//! Thread-safe account store
//!
//! This module provides the `AccountStore` struct, which holds every user row
//! together with the handle and token indexes used for sign-in and session
//! resolution.
//!
//! # Design
//!
//! Rows live in a `DashMap` keyed by user ID, so operations on different users
//! only contend on shard locks. Balance changes go through [`AccountStore::commit`],
//! an optimistic compare-and-set on the row version: the caller reads a snapshot,
//! decides, then commits only if nobody else committed in between.
//!
//! # Lock Ordering
//!
//! Locks are always taken in the order handle index → user row → token index /
//! ownership ledger. A user row guard is never held while another user row is
//! looked up.

use crate::types::{BookstoreError, User, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe store of user rows
#[derive(Debug)]
pub struct AccountStore {
    /// User rows by ID
    users: DashMap<UserId, User>,

    /// Handle → user ID, enforces handle uniqueness
    handles: DashMap<String, UserId>,

    /// Token → user ID, kept in step with `User::token`
    tokens: DashMap<String, UserId>,

    /// Next user ID to allocate
    next_id: AtomicU64,
}

impl AccountStore {
    /// Create an empty AccountStore
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            handles: DashMap::new(),
            tokens: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Rebuild a store from persisted rows
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` if two rows share an ID, a handle or a token.
    pub fn restore(users: Vec<User>) -> Result<Self, BookstoreError> {
        let store = Self::new();
        let mut max_id = 0;

        for user in users {
            max_id = max_id.max(user.id);

            if store.handles.insert(user.handle.clone(), user.id).is_some() {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "duplicate handle '{}'",
                    user.handle
                )));
            }
            if let Some(token) = &user.token {
                if store.tokens.insert(token.clone(), user.id).is_some() {
                    return Err(BookstoreError::corrupt_snapshot(format!(
                        "token shared by several users (user {})",
                        user.id
                    )));
                }
            }
            let id = user.id;
            if store.users.insert(id, user).is_some() {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "duplicate user id {}",
                    id
                )));
            }
        }

        store.next_id.store(max_id + 1, Ordering::SeqCst);
        Ok(store)
    }

    /// Insert a new user under a unique handle
    ///
    /// The handle index entry is held while the row is inserted, so two
    /// concurrent registrations of the same handle cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `HandleTaken` if the handle already exists.
    pub fn register(&self, handle: &str, credential: String) -> Result<UserId, BookstoreError> {
        match self.handles.entry(handle.to_string()) {
            Entry::Occupied(_) => Err(BookstoreError::handle_taken(handle)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.users.insert(id, User::new(id, handle, credential));
                slot.insert(id);
                Ok(id)
            }
        }
    }

    /// Get a copy of a user row
    ///
    /// The returned value is a snapshot; its `version` is what a later
    /// [`commit`](Self::commit) must match.
    pub fn snapshot(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|user| user.value().clone())
    }

    /// Look up a user ID by handle
    pub fn find_by_handle(&self, handle: &str) -> Option<UserId> {
        self.handles.get(handle).map(|id| *id.value())
    }

    /// Look up the user currently holding a token
    ///
    /// The index hit is confirmed against the row, so a token that was
    /// rotated or cleared in the meantime never resolves.
    pub fn find_by_token(&self, token: &str) -> Option<UserId> {
        let id = self.tokens.get(token).map(|id| *id.value())?;
        let user = self.users.get(&id)?;
        (user.token.as_deref() == Some(token)).then_some(id)
    }

    /// Replace a user's token, keeping the token index in step
    ///
    /// Passing `None` signs the user out.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the user no longer exists.
    pub fn set_token(&self, id: UserId, token: Option<String>) -> Result<(), BookstoreError> {
        let mut user = self.users.get_mut(&id).ok_or(BookstoreError::Unauthorized)?;

        if let Some(old) = user.token.take() {
            self.tokens.remove(&old);
        }
        if let Some(new) = &token {
            self.tokens.insert(new.clone(), id);
        }
        user.token = token;
        Ok(())
    }

    /// Commit a change to a user row if its version is unchanged
    ///
    /// The closure runs while the row is locked. It must perform every fallible
    /// check before mutating anything: on `Err` the row is left as the closure
    /// left it and the version is not bumped. On `Ok` the version is bumped.
    ///
    /// # Arguments
    ///
    /// * `id` - The user whose row is updated
    /// * `expected_version` - The version observed by the caller's read
    /// * `f` - The mutation
    ///
    /// # Errors
    ///
    /// * `Unauthorized` if the user was deleted
    /// * `WriteConflict` if the row changed since it was read
    /// * whatever the closure returns
    pub fn commit<T, F>(&self, id: UserId, expected_version: u64, f: F) -> Result<T, BookstoreError>
    where
        F: FnOnce(&mut User) -> Result<T, BookstoreError>,
    {
        let mut entry = self.users.get_mut(&id).ok_or(BookstoreError::Unauthorized)?;
        let user = entry.value_mut();

        if user.version != expected_version {
            return Err(BookstoreError::write_conflict(
                id,
                expected_version,
                user.version,
            ));
        }

        let value = f(user)?;
        user.version += 1;
        Ok(value)
    }

    /// Remove a user row and its index entries
    ///
    /// The closure runs under the row lock just before the row disappears, so
    /// dependent records (ownership) can be cleaned up without a concurrent
    /// commit slipping in between.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the user does not exist.
    pub fn remove<F>(&self, id: UserId, cleanup: F) -> Result<User, BookstoreError>
    where
        F: FnOnce(&User),
    {
        let (_, user) = self
            .users
            .remove_if(&id, |_, user| {
                cleanup(user);
                true
            })
            .ok_or(BookstoreError::Unauthorized)?;

        self.handles.remove(&user.handle);
        if let Some(token) = &user.token {
            self.tokens.remove(token);
        }
        Ok(user)
    }

    /// Get all user rows
    ///
    /// The returned vector is a snapshot taken row by row and is sorted by ID.
    pub fn all_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|user| user.id);
        users
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_register_allocates_sequential_ids() {
        let store = AccountStore::new();

        assert_eq!(store.register("alice", "h1".to_string()).unwrap(), 1);
        assert_eq!(store.register("bob", "h2".to_string()).unwrap(), 2);

        let alice = store.snapshot(1).unwrap();
        assert_eq!(alice.handle, "alice");
        assert_eq!(alice.balance, Decimal::ZERO);
        assert_eq!(alice.token, None);
        assert_eq!(alice.version, 0);
    }

    #[test]
    fn test_register_rejects_duplicate_handle() {
        let store = AccountStore::new();
        store.register("alice", "h1".to_string()).unwrap();

        let result = store.register("alice", "h2".to_string());

        assert_eq!(result, Err(BookstoreError::handle_taken("alice")));
        assert_eq!(store.all_users().len(), 1);
    }

    #[test]
    fn test_concurrent_register_same_handle_single_winner() {
        let store = Arc::new(AccountStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.register("alice", "h".to_string()).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.all_users().len(), 1);
    }

    #[test]
    fn test_set_token_rotates_index() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();

        store.set_token(id, Some("t1".to_string())).unwrap();
        assert_eq!(store.find_by_token("t1"), Some(id));

        store.set_token(id, Some("t2".to_string())).unwrap();
        assert_eq!(store.find_by_token("t1"), None);
        assert_eq!(store.find_by_token("t2"), Some(id));

        store.set_token(id, None).unwrap();
        assert_eq!(store.find_by_token("t2"), None);
    }

    #[test]
    fn test_find_by_token_is_case_sensitive() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();
        store.set_token(id, Some("Token".to_string())).unwrap();

        assert_eq!(store.find_by_token("token"), None);
        assert_eq!(store.find_by_token("Token"), Some(id));
    }

    #[test]
    fn test_commit_bumps_version() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();

        store
            .commit(id, 0, |user| {
                user.balance = Decimal::new(1000, 2);
                Ok(())
            })
            .unwrap();

        let user = store.snapshot(id).unwrap();
        assert_eq!(user.balance, Decimal::new(1000, 2));
        assert_eq!(user.version, 1);
    }

    #[test]
    fn test_commit_with_stale_version_conflicts() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();
        store.commit(id, 0, |_| Ok(())).unwrap();

        let result = store.commit(id, 0, |user| {
            user.balance = Decimal::ONE;
            Ok(())
        });

        assert_eq!(result, Err(BookstoreError::write_conflict(id, 0, 1)));
        assert_eq!(store.snapshot(id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_commit_error_from_closure_keeps_version() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();

        let result: Result<(), _> = store.commit(id, 0, |_| Err(BookstoreError::not_owned(id, 1)));

        assert_eq!(result, Err(BookstoreError::not_owned(id, 1)));
        assert_eq!(store.snapshot(id).unwrap().version, 0);
    }

    #[test]
    fn test_commit_on_missing_user_is_unauthorized() {
        let store = AccountStore::new();

        let result = store.commit(42, 0, |_| Ok(()));

        assert_eq!(result, Err(BookstoreError::Unauthorized));
    }

    #[test]
    fn test_remove_clears_indexes() {
        let store = AccountStore::new();
        let id = store.register("alice", "h".to_string()).unwrap();
        store.set_token(id, Some("t".to_string())).unwrap();

        let mut cleaned = false;
        let removed = store.remove(id, |_| cleaned = true).unwrap();

        assert!(cleaned);
        assert_eq!(removed.handle, "alice");
        assert_eq!(store.find_by_handle("alice"), None);
        assert_eq!(store.find_by_token("t"), None);
        assert!(store.snapshot(id).is_none());
        assert_eq!(store.remove(id, |_| {}), Err(BookstoreError::Unauthorized));
    }

    #[test]
    fn test_restore_continues_id_sequence() {
        let mut alice = User::new(4, "alice", "h");
        alice.token = Some("t".to_string());
        let store = AccountStore::restore(vec![alice, User::new(2, "bob", "h")]).unwrap();

        assert_eq!(store.find_by_token("t"), Some(4));
        assert_eq!(store.register("carol", "h".to_string()).unwrap(), 5);
    }

    #[test]
    fn test_restore_rejects_duplicate_handle() {
        let result = AccountStore::restore(vec![User::new(1, "alice", "h"), User::new(2, "alice", "h")]);

        assert!(matches!(result, Err(BookstoreError::CorruptSnapshot { .. })));
    }
}
