//! Market Data
//!
//! Upstream quote feeds and the freshness-bounded cache in front of them.

mod cache;
mod fixed;
mod polygon;

pub use cache::{MarketDataCache, RefreshHandle};
pub use fixed::StaticFeed;
pub use polygon::{PolygonFeed, parse_snapshot_payload};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::Quote;

/// Market feed trait (Strategy pattern)
///
/// Implement this for each quote source. Implementations must either return
/// a fully parsed set of quotes or an error; never a partially defaulted one.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Fetch the latest quotes for the requested symbols
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, FetchError>;

    /// Feed name
    fn name(&self) -> &str;
}
