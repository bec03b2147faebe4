//! # advisor-context
//!
//! Grounding context for a retirement investment advisor.
//!
//! Every question sent to the model is wrapped in a context block built from
//! two sources:
//!
//! - **Market data** - the latest cached quote snapshot, refreshed in the background
//! - **Conversation memory** - the user's own past turns most similar to the question
//!
//! A deterministic [`allocation`] engine turns a risk profile into a
//! stocks/bonds/cash split that can be appended to the context.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐   refresh   ┌──────────────────┐
//! │  MarketFeed  │ ──────────▶ │ MarketDataCache  │──┐
//! └──────────────┘             └──────────────────┘  │ get_latest
//!                                                    ▼
//! ┌──────────────┐   insert    ┌──────────────────┐ ┌──────────────────┐
//! │   TurnLog    │ ◀────────── │ ContextAssembler │◀┤ build_context    │
//! └──────────────┘             └──────────────────┘ └──────────────────┘
//!                                  │ index_turn      ▲ query_similar
//!                                  ▼                 │
//!                              ┌──────────────────┐  │
//!                              │   VectorStore    │──┘
//!                              └──────────────────┘
//! ```

pub mod allocation;
pub mod assembler;
pub mod config;
pub mod error;
pub mod market;
pub mod model;
pub mod retrieval;

use advisor_core::Message;

pub use assembler::ContextAssembler;
pub use config::EngineConfig;
pub use error::{AdvisorError, FetchError, Result};
pub use market::{MarketDataCache, MarketFeed, PolygonFeed, RefreshHandle, StaticFeed};
pub use model::{AllocationResult, Profile, Quote, RiskTolerance, Snapshot, SnapshotSource};
pub use retrieval::{ScoredTurn, VectorStore};

/// System prompt for the retirement advisor
pub const ADVISOR_SYSTEM_PROMPT: &str = r"You are a knowledgeable retirement investment advisor. Provide personalized advice based on the context supplied with each question.

## Guidelines

1. **Long-term focus** - Frame advice around retirement horizons, not short-term trading
2. **Use the context** - Refer to the current market data and the user's previous conversations for continuity
3. **Stay grounded** - Only quote prices that appear in the market data; say so when data is missing
4. **Ask when unsure** - If the user hasn't shared their age, horizon or risk tolerance, ask follow-up questions

Provide clear, professional advice. You are not a licensed fiduciary; remind users to verify important decisions with one.";

/// Wrap a context block and question into the message list sent to the model
pub fn advisor_messages(context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(ADVISOR_SYSTEM_PROMPT),
        Message::user(format!("Context:\n{context}\n\nUser Question: {question}")),
    ]
}
