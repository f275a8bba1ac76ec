//! Idempotent replay of mutating requests
//!
//! A client that retries a deposit, buy or return after a lost response
//! attaches the same request ID to both attempts. The first completed
//! attempt's outcome is recorded per (user ID, request ID) and handed back for
//! the retry instead of calling the engine a second time.
//!
//! The cache is bounded: once `max_size` keys are tracked, the oldest key is
//! evicted to make room.

use crate::types::{BookstoreError, Outcome, UserId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// (user ID, request ID)
///
/// User IDs are never reused, unlike handles.
pub type IdempotencyKey = (UserId, String);

/// Default number of tracked keys
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    outcomes: HashMap<IdempotencyKey, Result<Outcome, BookstoreError>>,
    /// Insertion order, front = oldest
    order: VecDeque<IdempotencyKey>,
}

/// Bounded cache of recorded request outcomes
#[derive(Debug)]
pub struct IdempotencyCache {
    entries: Mutex<Entries>,
    max_size: usize,
}

impl IdempotencyCache {
    /// Create a cache tracking at most `max_size` keys
    ///
    /// A zero size falls back to [`DEFAULT_CAPACITY`].
    pub fn new(max_size: usize) -> Self {
        let max_size = if max_size == 0 {
            tracing::warn!(default = DEFAULT_CAPACITY, "Idempotency cache size 0, using default");
            DEFAULT_CAPACITY
        } else {
            max_size
        };
        Self {
            entries: Mutex::new(Entries::default()),
            max_size,
        }
    }

    /// Recorded outcome for a key, if any
    pub fn get(&self, key: &IdempotencyKey) -> Option<Result<Outcome, BookstoreError>> {
        self.lock().outcomes.get(key).cloned()
    }

    /// Record the outcome of a completed attempt
    ///
    /// Transient failures are not recorded, so a retry gets a fresh attempt.
    /// An existing record is never overwritten.
    pub fn record(&self, key: IdempotencyKey, outcome: &Result<Outcome, BookstoreError>) {
        if matches!(outcome, Err(BookstoreError::TransientFailure { .. })) {
            return;
        }

        let mut entries = self.lock();
        if entries.outcomes.contains_key(&key) {
            return;
        }
        if entries.outcomes.len() >= self.max_size {
            if let Some(oldest) = entries.order.pop_front() {
                entries.outcomes.remove(&oldest);
            }
        }
        entries.order.push_back(key.clone());
        entries.outcomes.insert(key, outcome.clone());
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.lock().outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        // Every update completes before the guard drops; poison carries no
        // partial state
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
