//! Market Data Cache
//!
//! Serves the latest complete quote snapshot without ever touching the
//! network on the read path. A background task refreshes it on a fixed
//! period; a failed refresh leaves the previous snapshot in place.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::MarketFeed;
use crate::error::FetchError;
use crate::model::{Quote, Snapshot};

pub struct MarketDataCache {
    feed: Option<Arc<dyn MarketFeed>>,
    snapshot: RwLock<Arc<Snapshot>>,
    fetch_timeout: Duration,
}

impl MarketDataCache {
    pub fn new(feed: Arc<dyn MarketFeed>, fetch_timeout: Duration) -> Self {
        Self {
            feed: Some(feed),
            snapshot: RwLock::new(Arc::new(Snapshot::fallback())),
            fetch_timeout,
        }
    }

    /// Cache with no upstream; always serves the fallback snapshot
    pub fn fallback_only() -> Self {
        Self {
            feed: None,
            snapshot: RwLock::new(Arc::new(Snapshot::fallback())),
            fetch_timeout: Duration::ZERO,
        }
    }

    pub const fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// Latest complete snapshot. Never blocks on I/O and never empty.
    pub fn get_latest(&self) -> Arc<Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// One upstream fetch attempt.
    ///
    /// On success the whole snapshot is swapped in at once. On failure the
    /// cache is untouched; the error is logged and returned to this caller only.
    pub async fn refresh(&self, symbols: &[String]) -> Result<Arc<Snapshot>, FetchError> {
        let feed = self.feed.as_ref().ok_or(FetchError::NotConfigured)?;

        let fetched = match tokio::time::timeout(self.fetch_timeout, feed.fetch_quotes(symbols)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        };

        let quotes = match fetched {
            Ok(quotes) if quotes.is_empty() => Err(FetchError::Empty),
            Ok(quotes) => covering(quotes, symbols),
            other => other,
        }
        .inspect_err(|e| {
            tracing::warn!(
                feed = feed.name(),
                error = %e,
                "Market refresh failed, keeping previous snapshot"
            );
        })?;

        let snapshot = Arc::new(Snapshot::from_feed(quotes));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        tracing::debug!(
            feed = feed.name(),
            quotes = snapshot.len(),
            "Market snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// Start the periodic refresh task. The first refresh runs immediately.
    pub fn spawn_refresh_loop(self: &Arc<Self>, symbols: Vec<String>, period: Duration) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cache = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                period_secs = period.as_secs(),
                symbols = ?symbols,
                "Market refresh loop started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Failures are logged inside refresh; the next tick retries
                        let _ = cache.refresh(&symbols).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Market refresh loop stopped");
        });

        RefreshHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Quotes for every watched symbol, or the first one that is missing
fn covering(quotes: Vec<Quote>, symbols: &[String]) -> Result<Vec<Quote>, FetchError> {
    match symbols
        .iter()
        .find(|s| !quotes.iter().any(|q| q.symbol.eq_ignore_ascii_case(s)))
    {
        Some(missing) => Err(FetchError::Malformed(format!("missing {}", missing.to_uppercase()))),
        None => Ok(quotes),
    }
}

/// Handle to the background refresh task.
///
/// Dropping the handle also stops the loop at its next wake-up.
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(self) {
        // Err only means the loop already exited
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Market refresh task ended abnormally");
        }
    }
}
