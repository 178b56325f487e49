//! Session storage
//!
//! The runtime only talks to [`SessionStore`]; the in-memory implementation
//! can be swapped for a sharded or external one without touching dispatch.

use super::{Session, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Get-or-create storage for per-user sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Existing session, or a fresh one at `Initial` that is inserted
    async fn get_or_create(&self, user: UserId) -> Session;

    /// Replace whatever is stored with a fresh session at `Initial`
    async fn reset(&self, user: UserId) -> Session;

    /// Read-only lookup; a fresh (not inserted) session when absent
    async fn get(&self, user: UserId) -> Session;

    /// Write back the session produced by a transition
    async fn save(&self, user: UserId, session: Session);

    /// Mark an existing session as active without changing it; absent users stay absent
    async fn touch(&self, user: UserId);

    /// Drop sessions last written before `cutoff`. Returns how many were removed.
    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize;

    async fn len(&self) -> usize;
}

/// Process-lifetime session map behind a single lock
///
/// The lock is never held across an await, and each user's events are
/// serialized by that user's runtime, so one lock is enough here.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, user: UserId) -> Session {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(user).or_default().clone()
    }

    async fn reset(&self, user: UserId) -> Session {
        let fresh = Session::new();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(user, fresh.clone());
        fresh
    }

    async fn get(&self, user: UserId) -> Session {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&user).cloned().unwrap_or_default()
    }

    async fn save(&self, user: UserId, mut session: Session) {
        session.updated_at = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(user, session);
    }

    async fn touch(&self, user: UserId) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get_mut(&user) {
            session.updated_at = Utc::now();
        }
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        before - sessions.len()
    }

    async fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
