//! Conversation Log
//!
//! Append-only persistence for turns. The engine never owns storage; it
//! talks to whatever backend implements [`TurnLog`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::turn::Turn;

/// Log collaborator trait for persistence
#[async_trait]
pub trait TurnLog: Send + Sync {
    /// Append a turn
    async fn insert(&self, turn: &Turn) -> Result<(), PersistenceError>;

    /// Most recent turns for a user, newest first
    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<Turn>, PersistenceError>;
}

/// In-memory turn log (for development/testing)
pub struct MemoryTurnLog {
    turns: RwLock<HashMap<String, Vec<Turn>>>,
}

impl Default for MemoryTurnLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTurnLog {
    pub fn new() -> Self {
        Self {
            turns: RwLock::new(HashMap::new()),
        }
    }

    /// Total turns across all users
    pub fn len(&self) -> usize {
        let turns = self.turns.read().unwrap_or_else(PoisonError::into_inner);
        turns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TurnLog for MemoryTurnLog {
    async fn insert(&self, turn: &Turn) -> Result<(), PersistenceError> {
        let mut turns = self
            .turns
            .write()
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        turns.entry(turn.user_id.clone()).or_default().push(turn.clone());
        tracing::debug!(user_id = %turn.user_id, turn_id = %turn.id, "turn persisted");
        Ok(())
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<Turn>, PersistenceError> {
        let turns = self
            .turns
            .read()
            .map_err(|e| PersistenceError::Read(e.to_string()))?;

        let mut result = turns.get(user_id).cloned().unwrap_or_default();

        // Sort by created_at descending
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_recent_newest_first_and_limited() {
        let log = MemoryTurnLog::new();
        let base = Utc::now();
        for i in 0..4 {
            let turn = Turn::user("u1", format!("q{i}")).at(base + Duration::seconds(i));
            log.insert(&turn).await.unwrap();
        }
        log.insert(&Turn::user("u2", "other")).await.unwrap();

        let recent = log.list_recent("u1", 2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q3", "q2"]);
        assert_eq!(log.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_user_is_empty() {
        let log = MemoryTurnLog::new();
        assert!(log.list_recent("nobody", 10).await.unwrap().is_empty());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_len_survives_poisoned_lock() {
        let log = Arc::new(MemoryTurnLog::new());
        log.insert(&Turn::user("u1", "hello")).await.unwrap();

        let poisoner = Arc::clone(&log);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.turns.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(result.is_err());
        assert!(log.turns.is_poisoned());
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }
}
