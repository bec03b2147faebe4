//! # advisor-core
//!
//! Shared vocabulary for the advisory context engine: conversation turns,
//! the error taxonomy, and the traits for the external capabilities the
//! engine consumes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ContextAssembler                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │   TurnLog   │  │   Embedder   │  │  LlmProvider         │  │
//! │  │ (persist)   │  │ (vectors)    │  │  (text generation)   │  │
//! │  └─────────────┘  └──────────────┘  └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every collaborator is a trait object, so storage backends, embedding
//! models and LLM providers can be swapped without touching engine logic.

pub mod embedding;
pub mod error;
pub mod history;
pub mod log;
pub mod message;
pub mod provider;
pub mod turn;

pub use embedding::Embedder;
pub use error::{CoreError, EmbeddingError, PersistenceError, Result};
pub use history::{HistoryDay, group_by_day};
pub use log::{MemoryTurnLog, TurnLog};
pub use message::{Message, Role};
pub use provider::LlmProvider;
pub use turn::{Turn, TurnId, TurnRole};
