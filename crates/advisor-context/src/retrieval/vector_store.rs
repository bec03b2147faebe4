//! Vector Store
//!
//! Holds each user's turn embeddings and answers nearest-neighbor queries.
//!
//! ```text
//! partitions: user_id ─► Arc<RwLock<Vec<IndexedTurn>>>
//!                          (insertion order, one lock per user)
//! ```
//!
//! A turn becomes visible to queries only once it is pushed, content and
//! embedding together, under its partition's write lock. Queries for
//! different users never share a partition lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use advisor_core::{Embedder, EmbeddingError, PersistenceError, Turn, TurnLog};

use crate::config::EngineConfig;

/// A retrieved turn with its similarity to the query
#[derive(Clone, Debug)]
pub struct ScoredTurn {
    pub turn: Turn,
    pub score: f32,
}

struct IndexedTurn {
    turn: Turn,
    embedding: Vec<f32>,
}

type Partition = Arc<RwLock<Vec<IndexedTurn>>>;

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    partitions: RwLock<HashMap<String, Partition>>,
    dimensions: usize,
    match_threshold: f32,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>, dimensions: usize, match_threshold: f32) -> Self {
        if embedder.dimensions() != dimensions {
            tracing::warn!(
                embedder = embedder.name(),
                embedder_dimensions = embedder.dimensions(),
                configured = dimensions,
                "Embedder dimensionality differs from configuration; mismatched vectors will be rejected"
            );
        }

        Self {
            embedder,
            partitions: RwLock::new(HashMap::new()),
            dimensions,
            match_threshold,
        }
    }

    pub fn from_config(embedder: Arc<dyn Embedder>, config: &EngineConfig) -> Self {
        Self::new(embedder, config.embedding_dimensions, config.match_threshold)
    }

    pub const fn match_threshold(&self) -> f32 {
        self.match_threshold
    }

    /// Embed text through the injected capability, checking dimensionality
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.embedder.embed(text).await?;
        self.check_dimensions(&vector)?;
        Ok(vector)
    }

    /// Store a turn's embedding under its owner.
    ///
    /// Re-upserting an existing turn id replaces that entry in place.
    pub fn upsert(&self, turn: Turn) -> Result<(), EmbeddingError> {
        let embedding = turn
            .embedding
            .clone()
            .ok_or_else(|| EmbeddingError::Missing(turn.id.to_string()))?;
        self.check_dimensions(&embedding)?;

        let partition = self.partition_or_create(&turn.user_id);
        let mut entries = partition.write().unwrap_or_else(PoisonError::into_inner);

        let entry = IndexedTurn { turn, embedding };
        match entries.iter().position(|e| e.turn.id == entry.turn.id) {
            Some(pos) => entries[pos] = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Embed a turn's content (unless it already carries a vector) and index it
    pub async fn index_turn(&self, mut turn: Turn) -> Result<(), EmbeddingError> {
        if turn.embedding.is_none() {
            turn.embedding = Some(self.embed(&turn.content).await?);
        }
        self.upsert(turn)
    }

    /// Rank one user's turns against a query vector.
    ///
    /// Drops everything below the match threshold and returns at most `k`,
    /// highest score first; equal scores put the most recent turn first.
    pub fn search(&self, user_id: &str, query: &[f32], k: usize) -> Vec<ScoredTurn> {
        if k == 0 {
            return Vec::new();
        }
        let Some(partition) = self.partition(user_id) else {
            return Vec::new();
        };
        let entries = partition.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits: Vec<ScoredTurn> = entries
            .iter()
            .filter_map(|entry| {
                let score = cosine_similarity(query, &entry.embedding)?;
                (score >= self.match_threshold).then(|| ScoredTurn {
                    turn: entry.turn.clone(),
                    score,
                })
            })
            .collect();
        drop(entries);

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.turn.created_at.cmp(&a.turn.created_at))
        });
        hits.truncate(k);
        hits
    }

    /// Most similar prior turns for this user, most similar first.
    ///
    /// Never fails: an unavailable embedder degrades to an empty result.
    pub async fn query_similar(&self, user_id: &str, query_text: &str, k: usize) -> Vec<Turn> {
        if k == 0 || self.len_for(user_id) == 0 {
            return Vec::new();
        }

        let query = match self.embed(query_text).await {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(
                    user_id,
                    embedder = self.embedder.name(),
                    error = %e,
                    "Query embedding failed, continuing without retrieved context"
                );
                return Vec::new();
            }
        };

        self.search(user_id, &query, k)
            .into_iter()
            .map(|hit| hit.turn)
            .collect()
    }

    /// Index a user's most recent logged turns.
    ///
    /// Turns that fail to embed are skipped. Returns how many were indexed.
    pub async fn warm_up(&self, log: &dyn TurnLog, user_id: &str, limit: usize) -> Result<usize, PersistenceError> {
        let mut turns = log.list_recent(user_id, limit).await?;
        // Oldest first so insertion order matches conversation order
        turns.reverse();

        let mut indexed = 0;
        for turn in turns {
            let turn_id = turn.id.clone();
            match self.index_turn(turn).await {
                Ok(()) => indexed += 1,
                Err(e) => tracing::warn!(user_id, turn_id = %turn_id, error = %e, "Skipping turn during warm-up"),
            }
        }

        tracing::info!(user_id, indexed, "Vector store warmed from log");
        Ok(indexed)
    }

    /// Number of indexed turns for a user
    pub fn len_for(&self, user_id: &str) -> usize {
        let Some(partition) = self.partition(user_id) else {
            return 0;
        };
        let len = partition.read().unwrap_or_else(PoisonError::into_inner).len();
        len
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), EmbeddingError> {
        if vector.len() == self.dimensions {
            Ok(())
        } else {
            Err(EmbeddingError::Dimensions {
                expected: self.dimensions,
                actual: vector.len(),
            })
        }
    }

    fn partition(&self, user_id: &str) -> Option<Partition> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    fn partition_or_create(&self, user_id: &str) -> Partition {
        if let Some(partition) = self.partition(user_id) {
            return partition;
        }
        Arc::clone(
            self.partitions
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(user_id.to_string())
                .or_default(),
        )
    }
}

/// Cosine similarity, or `None` for mismatched lengths and zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let score = (dot / denom) as f32;
    Some(score)
}
