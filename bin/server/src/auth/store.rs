//! In-memory session store.
//!
//! Session records belong exclusively to one browser's cookie, so a plain
//! `RwLock<HashMap>` is enough: requests only contend on the map itself,
//! never on each other's records, and no lock is held across an await.

use gatehouse_identity::{SessionData, SessionId, SessionStore};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Process-local `SessionStore` implementation.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionData>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &SessionId) -> Option<SessionData> {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Session store lock poisoned");
                return None;
            }
        };

        match sessions.get(id) {
            Some(session) if session.is_expired() => {
                sessions.remove(id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    fn insert(&self, id: SessionId, data: SessionData) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(id, data);
        } else {
            warn!("Session store lock poisoned, dropping session write");
        }
    }

    fn remove(&self, id: &SessionId) -> Option<SessionData> {
        self.sessions.write().ok()?.remove(id)
    }

    fn purge_expired(&self) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            warn!("Session store lock poisoned, skipping purge");
            return 0;
        };

        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// Spawns a background task that periodically drops expired sessions.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_cleanup_task(
    store: Arc<dyn SessionStore>,
    cleanup_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(cleanup_interval_secs));

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let purged = store.purge_expired();
            if purged > 0 {
                info!(purged, "Session cleanup completed");
            } else {
                debug!("Session cleanup: no expired sessions");
            }
            debug!(active_sessions = store.len(), "Session store status");
        }
    })
}
