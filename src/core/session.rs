//! Session resolution
//!
//! Maps an opaque token to the identity of the user currently holding it.
//! This is the trust boundary for every user-scoped operation: the purchase
//! engine only accepts a [`UserIdentity`], and identities can only be minted
//! here or by the authentication service after checking a password.

use crate::core::AccountStore;
use crate::types::{BookstoreError, UserId};
use std::sync::Arc;

/// Proof that a request was made on behalf of a user
///
/// Not constructible outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    id: UserId,
}

impl UserIdentity {
    pub(crate) fn new(id: UserId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> UserId {
        self.id
    }
}

/// Token to identity resolver backed by the account store
#[derive(Debug, Clone)]
pub struct SessionResolver {
    accounts: Arc<AccountStore>,
}

impl SessionResolver {
    pub fn new(accounts: Arc<AccountStore>) -> Self {
        Self { accounts }
    }

    /// Resolve a token to a user identity
    ///
    /// Matching is exact (case-sensitive, no trimming). A missing or empty
    /// token is rejected without touching storage.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is empty or no user holds it.
    pub fn resolve(&self, token: Option<&str>) -> Result<UserIdentity, BookstoreError> {
        match token {
            None | Some("") => Err(BookstoreError::Unauthorized),
            Some(token) => self
                .accounts
                .find_by_token(token)
                .map(UserIdentity::new)
                .ok_or(BookstoreError::Unauthorized),
        }
    }
}
