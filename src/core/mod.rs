//! Core business logic module
//!
//! This module contains the bookstore components, leaves first:
//! - `account_store` - User rows, handle and token indexes, versioned commits
//! - `catalog_store` - Read-only item catalog
//! - `ownership_ledger` - Which user owns which item
//! - `retry` - Bounded retry of conflicting commits
//! - `engine` - Atomic buy, return and deposit
//! - `session` - Token to identity resolution
//! - `credentials` - argon2 password hashing
//! - `auth` - Registration, sign-in, sign-out and deletion
//! - `idempotency` - Replay of retried mutating requests
//! - `dispatcher` - Request records to service calls
//! - `bookstore` - Assembly, persistence and reporting
//! - `batch_processor` - Concurrent per-user batch processing

pub mod account_store;
pub mod auth;
pub mod batch_processor;
pub mod bookstore;
pub mod catalog_store;
pub mod credentials;
pub mod dispatcher;
pub mod engine;
pub mod idempotency;
pub mod ownership_ledger;
pub mod retry;
pub mod session;

pub use account_store::AccountStore;
pub use auth::{AuthService, Session};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use bookstore::{Bookstore, EngineConfig};
pub use catalog_store::CatalogStore;
pub use credentials::{CredentialHasher, HashingConfig};
pub use dispatcher::RequestHandler;
pub use engine::PurchaseEngine;
pub use idempotency::IdempotencyCache;
pub use ownership_ledger::OwnershipLedger;
pub use retry::RetryPolicy;
pub use session::{SessionResolver, UserIdentity};
