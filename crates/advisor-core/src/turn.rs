//! Conversation Turns
//!
//! One message in a user's append-only conversation log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Role;

/// Unique turn identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(String);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Self::User,
            TurnRole::Assistant => Self::Assistant,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Role::from(*self).fmt(f)
    }
}

/// A single conversation turn.
///
/// Turns are immutable once created. `embedding` stays `None` until the
/// embedding capability has produced a vector for `content`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,

    /// Owner; partitions storage and retrieval
    pub user_id: String,

    pub role: TurnRole,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn stamped with the current time
    pub fn new(user_id: impl Into<String>, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            user_id: user_id.into(),
            role,
            content: content.into(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(user_id, TurnRole::User, content)
    }

    pub fn assistant(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(user_id, TurnRole::Assistant, content)
    }

    /// Assistant reply to this turn, stamped strictly after it
    pub fn reply(&self, content: impl Into<String>) -> Self {
        // Coarse clocks can repeat a timestamp; keep conversation order total
        let created_at = Utc::now().max(self.created_at + Duration::microseconds(1));
        Self::assistant(self.user_id.clone(), content).at(created_at)
    }

    /// Override the creation timestamp (imports, tests)
    #[must_use]
    pub const fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach a computed embedding
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}
