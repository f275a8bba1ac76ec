//! Request dispatch
//!
//! This module provides the `RequestHandler`, which turns one [`RequestRecord`]
//! into the matching authentication, session and engine calls.
//!
//! # Client Tokens
//!
//! Request streams name the acting client by handle, the way a real client
//! would hold on to the token it got back from registration or sign-in. The
//! handler remembers the last token issued per handle and sends it with every
//! later request of that handle, unless the record carries an explicit token.
//! Signing out or deleting forgets the remembered token, so later requests of
//! that handle go out without one and are rejected as `Unauthorized`.
//!
//! # Idempotent Replay
//!
//! Deposit, buy and return records with a request ID are looked up in the
//! [`IdempotencyCache`] once their token has resolved; a recorded outcome is
//! returned without calling the engine. Outcomes are keyed by user ID, so a
//! handle registered again after deletion does not inherit them. Records of
//! one handle must be handled in order (the batch processor guarantees this),
//! so two attempts with the same key never race.

use crate::core::{AuthService, IdempotencyCache, PurchaseEngine, SessionResolver, UserIdentity};
use crate::types::{BookstoreError, Outcome, RequestRecord, RequestType};
use dashmap::DashMap;

/// Serves request records against one bookstore
#[derive(Debug)]
pub struct RequestHandler {
    auth: AuthService,
    sessions: SessionResolver,
    engine: PurchaseEngine,

    /// Last token issued per handle
    client_tokens: DashMap<String, String>,

    idempotency: IdempotencyCache,
}

impl RequestHandler {
    pub fn new(
        auth: AuthService,
        sessions: SessionResolver,
        engine: PurchaseEngine,
        idempotency: IdempotencyCache,
    ) -> Self {
        Self {
            auth,
            sessions,
            engine,
            client_tokens: DashMap::new(),
            idempotency,
        }
    }

    /// Remember a token for a handle, as if the client had kept it
    ///
    /// Used when a client already holds a token from an earlier run.
    pub fn remember_token(&self, handle: impl Into<String>, token: impl Into<String>) {
        self.client_tokens.insert(handle.into(), token.into());
    }

    /// Handle a single request record
    ///
    /// Every outcome is logged: successes at debug level, business-rule
    /// rejections at info level, everything else at warn level.
    pub fn handle(&self, record: &RequestRecord) -> Result<Outcome, BookstoreError> {
        let result = self.execute(record);

        match &result {
            Ok(outcome) => {
                tracing::debug!(kind = %record.kind, handle = %record.user, ?outcome, "Request completed")
            }
            Err(e) if e.is_rejection() => {
                tracing::info!(kind = %record.kind, handle = %record.user, error = %e, "Request rejected")
            }
            Err(e) => {
                tracing::warn!(kind = %record.kind, handle = %record.user, error = %e, "Request failed")
            }
        }
        result
    }

    fn execute(&self, record: &RequestRecord) -> Result<Outcome, BookstoreError> {
        let kind = record.kind;
        match kind {
            RequestType::Register => {
                let password = record.password.as_deref().unwrap_or_default();
                let session = self.auth.register(&record.user, password)?;
                self.remember_token(record.user.as_str(), session.token);
                Ok(Outcome::Registered {
                    user: session.identity.id(),
                })
            }
            RequestType::SignIn => {
                let password = record.password.as_deref().unwrap_or_default();
                let session = self.auth.sign_in(&record.user, password)?;
                self.remember_token(record.user.as_str(), session.token);
                Ok(Outcome::SignedIn {
                    user: session.identity.id(),
                })
            }
            RequestType::SignOut => {
                self.auth.sign_out(self.token_for(record).as_deref())?;
                self.client_tokens.remove(&record.user);
                Ok(Outcome::SignedOut)
            }
            RequestType::Delete => {
                self.auth.delete_user(self.token_for(record).as_deref())?;
                self.client_tokens.remove(&record.user);
                Ok(Outcome::Deleted)
            }
            RequestType::Deposit => self.replayable(record, |user| {
                let amount = record
                    .amount
                    .ok_or_else(|| BookstoreError::missing_field(kind, "an amount"))?;
                self.engine.deposit(user, amount).map(Outcome::Deposited)
            }),
            RequestType::Buy => self.replayable(record, |user| {
                let item = record
                    .item
                    .ok_or_else(|| BookstoreError::missing_field(kind, "an item"))?;
                self.engine.buy(user, item).map(Outcome::Owned)
            }),
            RequestType::Return => self.replayable(record, |user| {
                let item = record
                    .item
                    .ok_or_else(|| BookstoreError::missing_field(kind, "an item"))?;
                self.engine.return_item(user, item).map(Outcome::Returned)
            }),
            RequestType::Balance => {
                let user = self.sessions.resolve(self.token_for(record).as_deref())?;
                self.engine.get_balance(&user).map(Outcome::Balance)
            }
            RequestType::Library => {
                let user = self.sessions.resolve(self.token_for(record).as_deref())?;
                self.engine.list_owned_items(&user).map(Outcome::Library)
            }
            RequestType::Catalog => Ok(Outcome::Catalog(self.engine.list_items())),
        }
    }

    /// Resolve the session, then run `op` at most once per request ID
    ///
    /// The token is checked before the cache, so a recorded outcome is only
    /// handed to the user it belongs to.
    fn replayable<F>(&self, record: &RequestRecord, op: F) -> Result<Outcome, BookstoreError>
    where
        F: FnOnce(&UserIdentity) -> Result<Outcome, BookstoreError>,
    {
        let user = self.sessions.resolve(self.token_for(record).as_deref())?;
        let Some(request_id) = &record.request_id else {
            return op(&user);
        };

        let key = (user.id(), request_id.clone());
        if let Some(recorded) = self.idempotency.get(&key) {
            tracing::debug!(
                kind = %record.kind,
                user = user.id(),
                request_id = %request_id,
                "Replaying recorded outcome"
            );
            return recorded;
        }

        let result = op(&user);
        self.idempotency.record(key, &result);
        result
    }

    /// Explicit token of the record, else the one remembered for its handle
    fn token_for(&self, record: &RequestRecord) -> Option<String> {
        record.token.clone().or_else(|| {
            self.client_tokens
                .get(&record.user)
                .map(|token| token.value().clone())
        })
    }
}
