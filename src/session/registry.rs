//! Live sessions keyed by user id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::{Backends, SessionError, WardrobeSession};
use crate::auth::UserIdentity;

struct CachedSession {
    session: Arc<WardrobeSession>,
    last_used: Mutex<Instant>,
}

impl CachedSession {
    fn new(session: Arc<WardrobeSession>) -> Self {
        Self {
            session,
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) -> Arc<WardrobeSession> {
        if let Ok(mut last_used) = self.last_used.lock() {
            *last_used = Instant::now();
        }
        self.session.clone()
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.last_used
            .lock()
            .map(|last_used| now.saturating_duration_since(*last_used))
            .unwrap_or_default()
    }
}

pub struct SessionRegistry {
    backends: Backends,
    sessions: RwLock<HashMap<String, CachedSession>>,
}

impl SessionRegistry {
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the user's session, loading it on first use. Failed loads are not cached.
    pub async fn get_or_load(
        &self,
        user: &UserIdentity,
    ) -> Result<Arc<WardrobeSession>, SessionError> {
        if let Some(cached) = self.sessions.read().await.get(&user.uid) {
            return Ok(cached.touch());
        }

        let session = Arc::new(WardrobeSession::load(user.clone(), self.backends.clone()).await?);
        let mut sessions = self.sessions.write().await;
        // Another request may have loaded it meanwhile
        let session = sessions
            .entry(user.uid.clone())
            .or_insert_with(|| CachedSession::new(session))
            .touch();
        tracing::debug!("{} active sessions", sessions.len());
        Ok(session)
    }

    /// Discard the cached session and load a fresh one from the stores.
    pub async fn reload(
        &self,
        user: &UserIdentity,
    ) -> Result<Arc<WardrobeSession>, SessionError> {
        let session = Arc::new(WardrobeSession::load(user.clone(), self.backends.clone()).await?);
        self.sessions
            .write()
            .await
            .insert(user.uid.clone(), CachedSession::new(session.clone()));
        Ok(session)
    }

    /// Drop the user's session. Returns whether one was loaded.
    pub async fn remove(&self, uid: &str) -> bool {
        self.sessions.write().await.remove(uid).is_some()
    }

    /// Drop sessions unused for at least `max_idle`. Sessions a request still holds are kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, cached| {
            Arc::strong_count(&cached.session) > 1 || cached.idle_for(now) < max_idle
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(
                "Evicted {} idle sessions, {} still active",
                evicted,
                sessions.len()
            );
        }
        evicted
    }

    #[cfg(test)]
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
