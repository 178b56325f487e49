//! Per-user conversation sessions
//!
//! A [`Session`] records how far a user has progressed through the
//! category -> topic -> script flow. Sessions live in a [`SessionStore`].

mod store;

pub use store::{InMemorySessionStore, SessionStore};

use chrono::{DateTime, Utc};
use std::fmt;

/// Stable user key derived from the Telegram chat id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Position in the category -> topic flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Initial,
    /// Categories have been offered; the next selection is a category
    Category,
    /// Topics have been offered (or are being generated); the next selection is a topic
    Topic,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Category => "category",
            Phase::Topic => "topic",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation progress for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    pub category: String,
    pub topic: String,
    /// Most recently generated script; empty until one succeeds
    pub script: String,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Initial,
            category: String::new(),
            topic: String::new(),
            script: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn has_script(&self) -> bool {
        !self.script.is_empty()
    }

    /// Same conversation content, ignoring when it was last written
    pub fn same_progress(&self, other: &Session) -> bool {
        self.phase == other.phase
            && self.category == other.category
            && self.topic == other.topic
            && self.script == other.script
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
