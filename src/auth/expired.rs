//! Remembers sessions whose token the backend has rejected.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::api::SessionKey;

/// How long an expired session is remembered.
pub const EXPIRED_SESSION_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// The set of sessions that the backend has rejected.
///
/// Used so that the log-in redirect for an expired session happens exactly
/// once, even if several requests of that session fail at the same time.
#[derive(Debug, Clone)]
pub struct ExpiredSessions {
    sessions: Arc<Mutex<HashMap<SessionKey, Instant>>>,
    retention: Duration,
}

impl Default for ExpiredSessions {
    fn default() -> Self {
        Self::new(EXPIRED_SESSION_RETENTION)
    }
}

impl ExpiredSessions {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionKey, Instant>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `session` has expired.
    ///
    /// Returns `true` if this is the first time the session was recorded.
    pub fn expire(&self, session: &SessionKey) -> bool {
        let mut sessions = self.lock();
        let retention = self.retention;
        sessions.retain(|_, expired_at| expired_at.elapsed() < retention);

        if sessions.contains_key(session) {
            return false;
        }

        sessions.insert(session.clone(), Instant::now());
        true
    }

    /// Whether `session` has been recorded as expired.
    pub fn contains(&self, session: &SessionKey) -> bool {
        self.lock()
            .get(session)
            .is_some_and(|expired_at| expired_at.elapsed() < self.retention)
    }
}
