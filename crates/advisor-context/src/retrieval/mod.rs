//! Semantic Retrieval
//!
//! Per-user embedding index over conversation turns.

mod vector_store;

pub use vector_store::{ScoredTurn, VectorStore, cosine_similarity};
