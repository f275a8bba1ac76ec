//! Authentication service
//!
//! Registration, sign-in, sign-out and account deletion. This is the only
//! place besides the [`SessionResolver`] that hands out a [`UserIdentity`],
//! and it only does so after creating the user or checking a password.

use crate::core::{AccountStore, CredentialHasher, OwnershipLedger, SessionResolver, UserIdentity};
use crate::types::BookstoreError;
use std::sync::Arc;
use uuid::Uuid;

/// A freshly issued session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: UserIdentity,
    pub token: String,
}

/// Issues and invalidates tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    accounts: Arc<AccountStore>,
    ledger: Arc<OwnershipLedger>,
    sessions: SessionResolver,
    hasher: CredentialHasher,
}

impl AuthService {
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<OwnershipLedger>,
        hasher: CredentialHasher,
    ) -> Self {
        let sessions = SessionResolver::new(Arc::clone(&accounts));
        Self {
            accounts,
            ledger,
            sessions,
            hasher,
        }
    }

    /// Create a user with a zero balance and sign them in
    ///
    /// # Errors
    ///
    /// * `InvalidCredentials` - handle or password is empty
    /// * `HandleTaken` - the handle is already registered
    /// * `CredentialHash` - hashing failed
    pub fn register(&self, handle: &str, password: &str) -> Result<Session, BookstoreError> {
        if handle.is_empty() || password.is_empty() {
            return Err(BookstoreError::InvalidCredentials);
        }
        // Cheap pre-check so a taken handle does not pay for a hash
        if self.accounts.find_by_handle(handle).is_some() {
            return Err(BookstoreError::handle_taken(handle));
        }

        let credential = self.hasher.hash(password)?;
        let id = self.accounts.register(handle, credential)?;
        let session = self.issue_token(UserIdentity::new(id))?;

        tracing::info!(user = id, handle, "User registered");
        Ok(session)
    }

    /// Check a password and issue a fresh token
    ///
    /// Any previous token of the user stops resolving.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown handle or a wrong password
    /// alike.
    pub fn sign_in(&self, handle: &str, password: &str) -> Result<Session, BookstoreError> {
        let user = self
            .accounts
            .find_by_handle(handle)
            .and_then(|id| self.accounts.snapshot(id))
            .ok_or(BookstoreError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.credential)? {
            tracing::debug!(handle, "Password mismatch");
            return Err(BookstoreError::InvalidCredentials);
        }

        let session = self.issue_token(UserIdentity::new(user.id))?;
        tracing::info!(user = user.id, handle, "User signed in");
        Ok(session)
    }

    /// Invalidate a token
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token does not resolve.
    pub fn sign_out(&self, token: Option<&str>) -> Result<UserIdentity, BookstoreError> {
        let identity = self.sessions.resolve(token)?;
        self.accounts.set_token(identity.id(), None)?;
        tracing::info!(user = identity.id(), "User signed out");
        Ok(identity)
    }

    /// Delete the user holding a token, with its ownership records
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token does not resolve.
    pub fn delete_user(&self, token: Option<&str>) -> Result<UserIdentity, BookstoreError> {
        let identity = self.sessions.resolve(token)?;
        let mut released = 0;
        let user = self.accounts.remove(identity.id(), |user| {
            released = self.ledger.remove_user(user.id);
        })?;

        tracing::info!(
            user = user.id,
            handle = %user.handle,
            items_released = released,
            "User deleted"
        );
        Ok(identity)
    }

    fn issue_token(&self, identity: UserIdentity) -> Result<Session, BookstoreError> {
        let token = Uuid::new_v4().to_string();
        self.accounts
            .set_token(identity.id(), Some(token.clone()))?;
        Ok(Session { identity, token })
    }
}
