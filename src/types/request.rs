//! Request-related types for the bookstore engine
//!
//! This module defines the inbound request records replayed by the
//! processing strategies, the receipts produced by balance-changing
//! operations and the outcome reported for each request.

use super::item::{Item, ItemId};
use super::user::UserId;
use rust_decimal::Decimal;
use std::fmt;

/// Request types supported by the bookstore
///
/// Each variant maps to one operation of the authentication service, the
/// purchase engine or the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Create a user and sign it in
    Register,

    /// Issue a fresh token for an existing user
    SignIn,

    /// Invalidate the current token
    SignOut,

    /// Remove the user together with everything it owns
    Delete,

    /// Credit cash to the user's balance
    Deposit,

    /// Purchase a catalog item
    ///
    /// Debits the item price and records ownership as one atomic step.
    Buy,

    /// Return an owned item
    ///
    /// Deletes the ownership record and refunds the price as one atomic step.
    Return,

    /// Read the current balance
    Balance,

    /// List the items the user owns
    Library,

    /// List the whole catalog (no authentication)
    Catalog,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::Register => "register",
            RequestType::SignIn => "signin",
            RequestType::SignOut => "signout",
            RequestType::Delete => "delete",
            RequestType::Deposit => "deposit",
            RequestType::Buy => "buy",
            RequestType::Return => "return",
            RequestType::Balance => "balance",
            RequestType::Library => "library",
            RequestType::Catalog => "catalog",
        };
        f.write_str(name)
    }
}

/// Input request record
///
/// Represents a single client request as read from the input CSV file.
/// Which optional fields are required depends on the request type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    /// The type of request
    pub kind: RequestType,

    /// Handle of the client issuing the request
    pub user: String,

    /// Password, required for register and signin
    pub password: Option<String>,

    /// Item reference, required for buy and return
    pub item: Option<ItemId>,

    /// Amount, required for deposit
    pub amount: Option<Decimal>,

    /// Explicit token overriding the one the client remembers
    pub token: Option<String>,

    /// Idempotency key for mutating requests
    pub request_id: Option<String>,
}

impl RequestRecord {
    /// Create a record with only the request type and the client handle set
    pub fn new(kind: RequestType, user: impl Into<String>) -> Self {
        RequestRecord {
            kind,
            user: user.into(),
            password: None,
            item: None,
            amount: None,
            token: None,
            request_id: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_item(mut self, item: ItemId) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Result of a committed balance change
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// The user whose balance changed
    pub user: UserId,

    /// The item bought or returned, `None` for deposits
    pub item: Option<ItemId>,

    /// The amount debited or credited
    pub amount: Decimal,

    /// The balance after the commit
    pub balance: Decimal,
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Registered { user: UserId },
    SignedIn { user: UserId },
    SignedOut,
    Deleted,
    Deposited(Receipt),
    Owned(Receipt),
    Returned(Receipt),
    Balance(Decimal),
    Library(Vec<Item>),
    Catalog(Vec<Item>),
}
