//! User-related types for the bookstore engine
//!
//! This module defines the stored User row and the report row the
//! pipelines print once all requests have been processed.

use super::item::ItemId;
use rust_decimal::Decimal;

/// User identifier
///
/// Allocated sequentially by the account store on registration.
pub type UserId = u64;

/// Stored user row
///
/// Represents everything the account store knows about a single user.
/// The `version` field is the optimistic concurrency stamp: every committed
/// change to the balance or to the user's ownership records bumps it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Opaque user identifier
    pub id: UserId,

    /// Display handle, unique across all users
    pub handle: String,

    /// Salted argon2 hash of the user's password (PHC string format)
    pub credential: String,

    /// Current session token, `None` when signed out
    pub token: Option<String>,

    /// Cash balance
    ///
    /// Never negative between transactions. Only the purchase engine
    /// mutates it.
    pub balance: Decimal,

    /// Optimistic concurrency version
    pub version: u64,
}

impl User {
    /// Create a new signed-out user with a zero balance
    ///
    /// # Arguments
    ///
    /// * `id` - The identifier allocated for this user
    /// * `handle` - The display handle
    /// * `credential` - The hashed password
    pub fn new(id: UserId, handle: impl Into<String>, credential: impl Into<String>) -> Self {
        User {
            id,
            handle: handle.into(),
            credential: credential.into(),
            token: None,
            balance: Decimal::ZERO,
            version: 0,
        }
    }
}

/// Final per-user state written by the processing strategies
#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    /// Display handle of the user
    pub handle: String,

    /// Balance at the end of processing
    pub balance: Decimal,

    /// Identifiers of the owned items, ascending
    pub items: Vec<ItemId>,
}
