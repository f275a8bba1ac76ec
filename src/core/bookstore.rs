//! Bookstore assembly
//!
//! Wires the stores, the authentication service, the purchase engine and the
//! request handler together, loads state from disk and saves it back.
//!
//! # Architecture
//!
//! ```text
//! Bookstore
//!     ├── Arc<AccountStore>      (users, tokens, balances)
//!     ├── Arc<CatalogStore>      (items and prices)
//!     ├── Arc<OwnershipLedger>   (who owns what)
//!     └── RequestHandler
//!             ├── AuthService
//!             ├── SessionResolver
//!             ├── PurchaseEngine
//!             └── IdempotencyCache
//! ```

use crate::core::{
    AccountStore, AuthService, CatalogStore, CredentialHasher, HashingConfig, IdempotencyCache,
    OwnershipLedger, PurchaseEngine, RequestHandler, RetryPolicy, SessionResolver,
};
use crate::io::snapshot::{self, Snapshot};
use crate::types::{BookstoreError, Item, Outcome, RequestRecord, User, UserReport};
use std::path::Path;
use std::sync::Arc;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Conflict retries of buy, return and deposit
    pub retry: RetryPolicy,

    /// Cost parameters for new credential hashes
    pub hashing: HashingConfig,

    /// Number of request IDs remembered for idempotent replay
    pub idempotency_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            hashing: HashingConfig::default(),
            idempotency_capacity: crate::core::idempotency::DEFAULT_CAPACITY,
        }
    }
}

/// A running bookstore
#[derive(Debug)]
pub struct Bookstore {
    accounts: Arc<AccountStore>,
    catalog: Arc<CatalogStore>,
    ledger: Arc<OwnershipLedger>,
    handler: RequestHandler,
}

impl Bookstore {
    /// Build a bookstore from in-memory state
    ///
    /// # Errors
    ///
    /// * `CorruptSnapshot` - duplicate rows, or an ownership record naming an
    ///   unknown user or item
    /// * `CredentialHash` - the hashing parameters are invalid
    pub fn new(
        items: Vec<Item>,
        snapshot: Snapshot,
        config: &EngineConfig,
    ) -> Result<Self, BookstoreError> {
        let catalog = Arc::new(CatalogStore::from_items(items)?);
        let accounts = Arc::new(AccountStore::restore(snapshot.users)?);

        for &(user, item) in &snapshot.ownership {
            if accounts.snapshot(user).is_none() {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "ownership of item {} by unknown user {}",
                    item, user
                )));
            }
            if !catalog.contains(item) {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "user {} owns unknown item {}",
                    user, item
                )));
            }
        }
        let ledger = Arc::new(OwnershipLedger::restore(snapshot.ownership)?);

        let hasher = CredentialHasher::new(&config.hashing)?;
        let handler = RequestHandler::new(
            AuthService::new(Arc::clone(&accounts), Arc::clone(&ledger), hasher),
            SessionResolver::new(Arc::clone(&accounts)),
            PurchaseEngine::new(
                Arc::clone(&accounts),
                Arc::clone(&catalog),
                Arc::clone(&ledger),
                config.retry.clone(),
            ),
            IdempotencyCache::new(config.idempotency_capacity),
        );

        // Clients that signed in during an earlier run still hold their token
        for user in accounts.all_users() {
            if let Some(token) = user.token {
                handler.remember_token(user.handle, token);
            }
        }

        Ok(Self {
            accounts,
            catalog,
            ledger,
            handler,
        })
    }

    /// Load the catalog and, if a data directory is given, the saved state
    pub fn open(
        catalog_path: &Path,
        data_dir: Option<&Path>,
        config: &EngineConfig,
    ) -> Result<Self, BookstoreError> {
        let items = snapshot::load_catalog(catalog_path)?;
        let state = match data_dir {
            Some(dir) => snapshot::load_snapshot(dir)?.unwrap_or_default(),
            None => Snapshot::default(),
        };
        Self::new(items, state, config)
    }

    /// Handle a single request record
    pub fn handle(&self, record: &RequestRecord) -> Result<Outcome, BookstoreError> {
        self.handler.handle(record)
    }

    /// Current state as a snapshot
    ///
    /// Taken row by row; call it once requests have stopped for a
    /// consistent picture.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.accounts.all_users(),
            ownership: self.ledger.records(),
        }
    }

    /// Save the current state into a data directory
    pub fn persist(&self, dir: &Path) -> Result<(), BookstoreError> {
        snapshot::save_snapshot(dir, &self.snapshot())
    }

    /// Per-user balance and owned items, sorted by handle
    pub fn report(&self) -> Vec<UserReport> {
        let mut reports: Vec<UserReport> = self
            .accounts
            .all_users()
            .into_iter()
            .map(|User { id, handle, balance, .. }| UserReport {
                handle,
                balance,
                items: self.ledger.items_of(id),
            })
            .collect();
        reports.sort_by(|a, b| a.handle.cmp(&b.handle));
        reports
    }

    /// Number of catalog items
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }
}
