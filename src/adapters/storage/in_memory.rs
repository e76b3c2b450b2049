//! In-memory session repository.
//!
//! One `tokio::sync::Mutex` per session key: checking a session out holds
//! its lock for the whole turn, which is what serializes turns per key while
//! letting different keys proceed in parallel. Sessions idle past the TTL
//! are replaced lazily on checkout and swept by a background eviction loop,
//! so the map stays bounded without the user ever deleting anything.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::foundation::{SessionKey, Timestamp};
use crate::domain::session::Session;
use crate::ports::{SessionGuard, SessionRepository};

type SessionCell = Arc<tokio::sync::Mutex<Session>>;

/// Keyed in-memory session store with TTL-based garbage collection.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionCell>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Spawns the periodic eviction sweep. The handle can be dropped; the
    /// loop runs for the life of the process.
    pub fn spawn_eviction_loop(store: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let cutoff = Timestamp::now().minus_secs(store.ttl.as_secs());
                let evicted = store.evict_older_than(cutoff).await;
                if evicted > 0 {
                    info!(evicted, "evicted idle sessions");
                }
            }
        })
    }

    /// Number of sessions currently held (for tests and diagnostics).
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell_for(&self, key: &SessionKey) -> SessionCell {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(session = %key, "creating session");
                Arc::new(tokio::sync::Mutex::new(Session::new(
                    key.clone(),
                    Timestamp::now(),
                )))
            })
            .clone()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> SessionGuard {
        let cell = self.cell_for(key);
        let mut guard = cell.lock_owned().await;

        // Idle sessions come back as if never seen.
        let now = Timestamp::now();
        if guard.is_expired(now, self.ttl.as_secs()) {
            debug!(session = %key, "session expired; starting fresh");
            *guard = Session::new(key.clone(), now);
        }

        SessionGuard::new(guard)
    }

    async fn evict_older_than(&self, cutoff: Timestamp) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, cell| {
            // A session we cannot lock is mid-turn; never evict it.
            match cell.try_lock() {
                Ok(session) => !session.last_activity().is_before(&cutoff),
                Err(_) => true,
            }
        });
        before - sessions.len()
    }

    async fn peek(&self, key: &SessionKey) -> Option<Session> {
        let cell = {
            let sessions = self.sessions.lock().unwrap();
            sessions.get(key).cloned()
        }?;
        let session = cell.lock().await.clone();
        Some(session)
    }
}
