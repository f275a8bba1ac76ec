//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `user`: User rows and per-user report rows
//! - `item`: Catalog items and identifiers
//! - `request`: Inbound request records, outcomes and receipts
//! - `error`: Error types for the bookstore engine

pub mod error;
pub mod item;
pub mod request;
pub mod user;

pub use error::BookstoreError;
pub use item::{Item, ItemId};
pub use request::{Outcome, Receipt, RequestRecord, RequestType};
pub use user::{User, UserId, UserReport};
