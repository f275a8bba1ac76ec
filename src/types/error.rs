//! Error types for the bookstore engine
//!
//! This module defines all error types that can occur while serving requests.
//! Errors are designed to be descriptive and user-friendly for CLI output.
//!
//! # Error Categories
//!
//! - **Authorization Errors**: Missing or unknown token
//! - **Business Rule Errors**: Unknown item, already owned, insufficient funds, etc.
//! - **Transaction Errors**: Optimistic commit conflicts and exhausted retries
//! - **Arithmetic Errors**: Overflow in balance calculations
//! - **File I/O Errors**: File not found, permission denied, malformed CSV, etc.

use crate::types::{ItemId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the bookstore engine
///
/// This enum represents all possible errors that can occur during
/// request processing. Each variant includes relevant context
/// to help diagnose and resolve the issue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookstoreError {
    /// The token is missing, empty or does not belong to any user
    ///
    /// Deliberately carries no context so it never reveals whether a
    /// token used to exist.
    #[error("Unauthorized")]
    Unauthorized,

    /// The referenced item is not in the catalog
    #[error("Item {item} not found")]
    ItemNotFound {
        /// Item ID that was not found
        item: ItemId,
    },

    /// The user already owns the item
    #[error("User {user} already owns item {item}")]
    AlreadyOwned {
        /// User ID
        user: UserId,
        /// Item ID
        item: ItemId,
    },

    /// The balance does not cover the item price
    ///
    /// The purchase is rejected and the account state remains unchanged.
    #[error("Insufficient funds for user {user}: balance {balance}, price {price}")]
    InsufficientFunds {
        /// User ID
        user: UserId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Price of the requested item
        price: Decimal,
    },

    /// The user does not own the item it tries to return
    #[error("User {user} does not own item {item}")]
    NotOwned {
        /// User ID
        user: UserId,
        /// Item ID
        item: ItemId,
    },

    /// A deposit amount that is zero or negative
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The rejected amount as given
        amount: String,
    },

    /// Registration with a handle that is already in use
    #[error("Handle '{handle}' is already taken")]
    HandleTaken {
        /// The requested handle
        handle: String,
    },

    /// Unknown handle or wrong password
    ///
    /// The two cases are intentionally indistinguishable.
    #[error("Invalid handle or password")]
    InvalidCredentials,

    /// The user row changed between the read and the commit
    ///
    /// Internal to the engine: it is retried and never returned to callers
    /// directly.
    #[error("Write conflict on user {user}: expected version {expected}, found {found}")]
    WriteConflict {
        /// User ID
        user: UserId,
        /// Version observed by the read phase
        expected: u64,
        /// Version found at commit time
        found: u64,
    },

    /// Commit conflicts persisted through every retry
    ///
    /// Nothing was mutated; the caller may retry the request.
    #[error("{operation} for user {user} failed after {attempts} attempts, please retry")]
    TransientFailure {
        /// Operation that failed
        operation: String,
        /// User ID
        user: UserId,
        /// Number of attempts made
        attempts: u32,
    },

    /// Arithmetic overflow would occur
    ///
    /// The operation is rejected to maintain account integrity.
    #[error("Arithmetic overflow in {operation} for user {user}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// User ID
        user: UserId,
    },

    /// Hashing or verifying a credential failed
    #[error("Credential hashing failed: {message}")]
    CredentialHash {
        /// Description of the failure
        message: String,
    },

    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Persisted state violates an invariant
    ///
    /// Raised while loading a snapshot, e.g. an ownership record that
    /// references an unknown user or item.
    #[error("Corrupt snapshot: {message}")]
    CorruptSnapshot {
        /// Description of the violation
        message: String,
    },
}

// Conversion from io::Error to BookstoreError
impl From<std::io::Error> for BookstoreError {
    fn from(error: std::io::Error) -> Self {
        BookstoreError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to BookstoreError
impl From<csv::Error> for BookstoreError {
    fn from(error: csv::Error) -> Self {
        // Extract line number if available
        let line = error.position().map(|pos| pos.line());

        BookstoreError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl BookstoreError {
    /// Create an ItemNotFound error
    pub fn item_not_found(item: ItemId) -> Self {
        BookstoreError::ItemNotFound { item }
    }

    /// Create an AlreadyOwned error
    pub fn already_owned(user: UserId, item: ItemId) -> Self {
        BookstoreError::AlreadyOwned { user, item }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(user: UserId, balance: Decimal, price: Decimal) -> Self {
        BookstoreError::InsufficientFunds {
            user,
            balance,
            price,
        }
    }

    /// Create a NotOwned error
    pub fn not_owned(user: UserId, item: ItemId) -> Self {
        BookstoreError::NotOwned { user, item }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString) -> Self {
        BookstoreError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Create a HandleTaken error
    pub fn handle_taken(handle: &str) -> Self {
        BookstoreError::HandleTaken {
            handle: handle.to_string(),
        }
    }

    /// Create a WriteConflict error
    pub fn write_conflict(user: UserId, expected: u64, found: u64) -> Self {
        BookstoreError::WriteConflict {
            user,
            expected,
            found,
        }
    }

    /// Create a TransientFailure error
    pub fn transient_failure(operation: &str, user: UserId, attempts: u32) -> Self {
        BookstoreError::TransientFailure {
            operation: operation.to_string(),
            user,
            attempts,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, user: UserId) -> Self {
        BookstoreError::ArithmeticOverflow {
            operation: operation.to_string(),
            user,
        }
    }

    /// Create a CredentialHash error
    pub fn credential_hash(message: impl ToString) -> Self {
        BookstoreError::CredentialHash {
            message: message.to_string(),
        }
    }

    /// Create a CorruptSnapshot error
    pub fn corrupt_snapshot(message: impl Into<String>) -> Self {
        BookstoreError::CorruptSnapshot {
            message: message.into(),
        }
    }

    /// Create a ParseError for a request lacking a field its type requires
    pub fn missing_field(kind: impl std::fmt::Display, field: &str) -> Self {
        BookstoreError::ParseError {
            line: None,
            message: format!("{} request requires {}", kind, field),
        }
    }

    /// Whether the error is a business-rule rejection the caller can act on
    ///
    /// These are logged at a lower level than infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BookstoreError::Unauthorized
                | BookstoreError::ItemNotFound { .. }
                | BookstoreError::AlreadyOwned { .. }
                | BookstoreError::InsufficientFunds { .. }
                | BookstoreError::NotOwned { .. }
                | BookstoreError::InvalidAmount { .. }
                | BookstoreError::HandleTaken { .. }
                | BookstoreError::InvalidCredentials
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    #[case::unauthorized(BookstoreError::Unauthorized, "Unauthorized")]
    #[case::item_not_found(BookstoreError::ItemNotFound { item: 9 }, "Item 9 not found")]
    #[case::already_owned(
        BookstoreError::AlreadyOwned { user: 1, item: 2 },
        "User 1 already owns item 2"
    )]
    #[case::insufficient_funds(
        BookstoreError::InsufficientFunds { user: 1, balance: Decimal::new(500, 2), price: Decimal::new(750, 2) },
        "Insufficient funds for user 1: balance 5.00, price 7.50"
    )]
    #[case::not_owned(BookstoreError::NotOwned { user: 3, item: 4 }, "User 3 does not own item 4")]
    #[case::transient_failure(
        BookstoreError::TransientFailure { operation: "buy".to_string(), user: 1, attempts: 4 },
        "buy for user 1 failed after 4 attempts, please retry"
    )]
    #[case::parse_error_with_line(
        BookstoreError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        BookstoreError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    #[case::file_not_found(
        BookstoreError::FileNotFound { path: "catalog.csv".to_string() },
        "File not found: catalog.csv"
    )]
    fn test_error_display(#[case] error: BookstoreError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::insufficient_funds(
        BookstoreError::insufficient_funds(1, Decimal::new(500, 2), Decimal::new(750, 2)),
        BookstoreError::InsufficientFunds { user: 1, balance: Decimal::new(500, 2), price: Decimal::new(750, 2) }
    )]
    #[case::handle_taken(
        BookstoreError::handle_taken("alice"),
        BookstoreError::HandleTaken { handle: "alice".to_string() }
    )]
    #[case::write_conflict(
        BookstoreError::write_conflict(1, 3, 4),
        BookstoreError::WriteConflict { user: 1, expected: 3, found: 4 }
    )]
    #[case::invalid_amount(
        BookstoreError::invalid_amount(Decimal::new(-1, 0)),
        BookstoreError::InvalidAmount { amount: "-1".to_string() }
    )]
    #[case::missing_field(
        BookstoreError::missing_field("buy", "an item"),
        BookstoreError::ParseError { line: None, message: "buy request requires an item".to_string() }
    )]
    fn test_helper_functions(#[case] result: BookstoreError, #[case] expected: BookstoreError) {
        assert_eq!(result, expected);
    }

    #[rstest]
    #[case(BookstoreError::Unauthorized, true)]
    #[case(BookstoreError::not_owned(1, 1), true)]
    #[case(BookstoreError::transient_failure("buy", 1, 4), false)]
    #[case(BookstoreError::credential_hash("boom"), false)]
    fn test_is_rejection(#[case] error: BookstoreError, #[case] expected: bool) {
        assert_eq!(error.is_rejection(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: BookstoreError = io_error.into();
        assert!(matches!(error, BookstoreError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
