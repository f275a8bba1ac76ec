//! Rust Bookstore Engine Library
//! # Overview
//!
//! This library provides a bookstore backend: token-based sessions, a cash
//! balance per user and atomic purchase/return of catalog items, plus a
//! streaming CSV request replayer with a sync and an async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (User, Item, RequestRecord, BookstoreError, etc.)
//! - [`cli`] - CLI arguments parsing and log setup
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Atomic buy, return and deposit
//!   - [`core::account_store`] - User rows with versioned commits
//!   - [`core::ownership_ledger`] - Ownership records
//!   - [`core::auth`] - Registration, sign-in, sign-out and deletion
//!   - [`core::dispatcher`] - Request records to service calls
//! - [`io`] - CSV readers, report writer and on-disk state
//! - [`strategy`] - Sync and async processing pipelines
//!
//! # Invariants
//!
//! - A balance is never negative
//! - A user owns an item at most once
//! - Every debit has its ownership record and every refund removes one;
//!   balance plus the price of owned items only changes through deposits
//! - Concurrent requests of one user never both spend the same money

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{Bookstore, EngineConfig, PurchaseEngine};
pub use io::write_report_csv;
pub use types::{
    BookstoreError, Item, ItemId, Outcome, Receipt, RequestRecord, RequestType, User, UserId,
    UserReport,
};
