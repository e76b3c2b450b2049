//! SessionRepository port - keyed session state with per-key exclusivity.
//!
//! Turns for the same session key must be serialized because slot resolution
//! mutates shared state. The repository hands out an exclusive [`SessionGuard`]
//! per key: mutations made through the guard are the atomic `update`, visible
//! to the next `get` the moment the guard drops. Turns for different keys
//! proceed in parallel.

use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use tokio::sync::OwnedMutexGuard;

use crate::domain::foundation::{SessionKey, Timestamp};
use crate::domain::session::Session;

/// Port for the session store.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Exclusive access to the session for `key`, creating an empty session
    /// if absent. A missing key is not an error. Waits behind any in-flight
    /// turn for the same key; sessions idle past the store's TTL come back
    /// fresh as if never seen.
    async fn get(&self, key: &SessionKey) -> SessionGuard;

    /// Garbage-collects sessions whose last activity predates `cutoff`.
    /// Sessions currently checked out are skipped. Returns the evicted count.
    async fn evict_older_than(&self, cutoff: Timestamp) -> usize;

    /// Point-in-time copy without exclusivity, or None if absent.
    async fn peek(&self, key: &SessionKey) -> Option<Session>;
}

/// Exclusive lease on one session. Holding it serializes the turn; mutations
/// persist when it drops.
pub struct SessionGuard {
    inner: OwnedMutexGuard<Session>,
}

impl SessionGuard {
    /// Wraps an owned lock guard. Used by repository implementations.
    pub fn new(inner: OwnedMutexGuard<Session>) -> Self {
        Self { inner }
    }
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.inner
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.inner
    }
}
