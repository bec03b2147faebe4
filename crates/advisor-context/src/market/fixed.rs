//! Static Feed
//!
//! In-process quotes for development and tests. Returns a fixed price table.

use async_trait::async_trait;
use rust_decimal_macros::dec;

use super::MarketFeed;
use crate::error::FetchError;
use crate::model::Quote;

/// Feed that serves a fixed set of quotes
pub struct StaticFeed {
    quotes: Vec<Quote>,
}

impl Default for StaticFeed {
    fn default() -> Self {
        Self::sample()
    }
}

impl StaticFeed {
    pub const fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    /// Realistic ETF prices covering the default watch-list and a few extras
    pub fn sample() -> Self {
        Self::new(vec![
            Quote::new("SPY", dec!(512.40)).with_change(dec!(3.10), dec!(0.61)),
            Quote::new("AGG", dec!(98.15)).with_change(dec!(-0.22), dec!(-0.22)),
            Quote::new("BIL", dec!(91.58)).with_change(dec!(0.01), dec!(0.01)),
            Quote::new("VTI", dec!(258.70)).with_change(dec!(1.45), dec!(0.56)),
            Quote::new("TLT", dec!(92.30)).with_change(dec!(-0.85), dec!(-0.91)),
            Quote::new("QQQ", dec!(438.90)).with_change(dec!(4.20), dec!(0.97)),
        ])
    }
}

#[async_trait]
impl MarketFeed for StaticFeed {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, FetchError> {
        let quotes: Vec<Quote> = symbols
            .iter()
            .filter_map(|s| self.quotes.iter().find(|q| q.symbol.eq_ignore_ascii_case(s)))
            .cloned()
            .collect();

        if quotes.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(quotes)
    }

    fn name(&self) -> &str {
        "StaticFeed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_feed_serves_requested_symbols() {
        let feed = StaticFeed::sample();
        let quotes = feed
            .fetch_quotes(&["agg".to_string(), "SPY".to_string(), "NOPE".to_string()])
            .await
            .unwrap();
        let symbols: Vec<_> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AGG", "SPY"]);
    }

    #[tokio::test]
    async fn test_unknown_symbols_only() {
        let feed = StaticFeed::sample();
        let result = feed.fetch_quotes(&["NOTREAL".to_string()]).await;
        assert!(matches!(result, Err(FetchError::Empty)));
    }
}
