//! Context Assembler
//!
//! Turns a user's question into the grounded context block handed to the
//! text-generation boundary, and records finished turns back into the log
//! and the vector store.

use std::sync::Arc;

use advisor_core::{HistoryDay, PersistenceError, Turn, TurnLog, group_by_day};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;

use crate::allocation;
use crate::market::MarketDataCache;
use crate::model::{Profile, Quote, Snapshot};
use crate::retrieval::VectorStore;

pub const MARKET_LABEL: &str = "Current Market Data:";
pub const HISTORY_LABEL: &str = "Previous Conversations:";
pub const ALLOCATION_LABEL: &str = "Recommended allocation:";

/// Similar turns pulled into each context
pub const DEFAULT_RETRIEVAL_K: usize = 5;

pub struct ContextAssembler {
    market: Arc<MarketDataCache>,
    store: Arc<VectorStore>,
    log: Arc<dyn TurnLog>,
    retrieval_k: usize,
}

impl ContextAssembler {
    pub fn new(market: Arc<MarketDataCache>, store: Arc<VectorStore>, log: Arc<dyn TurnLog>) -> Self {
        Self {
            market,
            store,
            log,
            retrieval_k: DEFAULT_RETRIEVAL_K,
        }
    }

    #[must_use]
    pub const fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub const fn market(&self) -> &Arc<MarketDataCache> {
        &self.market
    }

    pub const fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Build the market and history sections for a question. Never fails.
    pub async fn build_context(&self, user_id: &str, question: &str) -> String {
        let snapshot = self.market.get_latest();
        let similar = self.store.query_similar(user_id, question, self.retrieval_k).await;

        tracing::debug!(
            user_id,
            quotes = snapshot.len(),
            retrieved = similar.len(),
            "Context assembled"
        );

        render_context(&snapshot, &similar)
    }

    /// Same as [`build_context`](Self::build_context) plus the profile's allocation
    pub async fn build_context_with_profile(&self, user_id: &str, question: &str, profile: &Profile) -> String {
        let mut context = self.build_context(user_id, question).await;
        context.push_str("\n\n");
        context.push_str(&render_allocation(profile));
        context
    }

    /// Persist a turn, then index it in the background.
    ///
    /// Only the persistence step can fail the call. Indexing failures are
    /// logged by the spawned task; the returned handle may be awaited or dropped.
    pub async fn record_turn(&self, turn: Turn) -> Result<JoinHandle<()>, PersistenceError> {
        self.log.insert(&turn).await.inspect_err(|e| {
            tracing::error!(user_id = %turn.user_id, turn_id = %turn.id, error = %e, "Failed to persist turn");
        })?;

        let store = Arc::clone(&self.store);
        Ok(tokio::spawn(async move {
            let user_id = turn.user_id.clone();
            let turn_id = turn.id.clone();
            if let Err(e) = store.index_turn(turn).await {
                tracing::warn!(
                    user_id = %user_id,
                    turn_id = %turn_id,
                    error = %e,
                    "Turn persisted but not indexed for retrieval"
                );
            }
        }))
    }

    /// Record a question and its reply, in that order
    pub async fn record_exchange(
        &self,
        user_id: &str,
        question: &str,
        reply: &str,
    ) -> Result<(JoinHandle<()>, JoinHandle<()>), PersistenceError> {
        let asked = Turn::user(user_id, question);
        let answered = asked.reply(reply);

        let first = self.record_turn(asked).await?;
        let second = self.record_turn(answered).await?;
        Ok((first, second))
    }

    /// Recent turns grouped by day, newest day first
    pub async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryDay>, PersistenceError> {
        let turns = self.log.list_recent(user_id, limit).await?;
        Ok(group_by_day(turns))
    }
}

/// Render both sections; empty sections keep their label
pub fn render_context(snapshot: &Snapshot, similar: &[Turn]) -> String {
    let market: Vec<String> = snapshot.quotes.iter().map(format_quote).collect();
    let history: Vec<&str> = similar.iter().map(|t| t.content.as_str()).collect();

    format!(
        "{MARKET_LABEL}\n{}\n\n{HISTORY_LABEL}\n{}",
        market.join("\n"),
        history.join("\n")
    )
}

/// `SPY: $512.40 (+0.61%)`
pub fn format_quote(quote: &Quote) -> String {
    format!(
        "{}: ${:.2} ({}%)",
        quote.symbol,
        quote.price.round_dp(2),
        signed_percent(quote.change_percent)
    )
}

fn signed_percent(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded > Decimal::ZERO {
        format!("+{rounded:.2}")
    } else if rounded.is_zero() {
        // Avoid "-0.00" for tiny negative changes
        "0.00".to_string()
    } else {
        format!("{rounded:.2}")
    }
}

fn render_allocation(profile: &Profile) -> String {
    let result = allocation::recommend_for(profile);
    format!(
        "{ALLOCATION_LABEL}\n{result}\nRisk tolerance: {}\nYears to retirement: {}\nMonthly contribution: ${:.2}\nRetirement goal: ${:.2}",
        profile.risk_tolerance,
        profile.years_to_retirement(),
        profile.monthly_contribution.round_dp(2),
        profile.retirement_goal.round_dp(2),
    )
}
