//! Polygon.io Feed
//!
//! Pulls the US stocks snapshot endpoint and parses it strictly: a payload
//! that lacks a price or a change figure is rejected, never zero-filled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;

use super::MarketFeed;
use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::model::Quote;

/// HTTP client for the Polygon v2 snapshot API
pub struct PolygonFeed {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PolygonFeed {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// `Ok(None)` when no API key is configured
    pub fn from_config(config: &EngineConfig) -> Result<Option<Self>, FetchError> {
        config
            .polygon_api_key
            .as_ref()
            .map(|key| Self::new(key.clone(), config.polygon_base_url.clone(), config.fetch_timeout))
            .transpose()
    }
}

#[async_trait]
impl MarketFeed for PolygonFeed {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, FetchError> {
        let url = format!("{}/snapshot/locale/us/markets/stocks/tickers", self.base_url);
        let tickers = symbols.join(",");

        let response = self
            .client
            .get(&url)
            .query(&[("tickers", tickers.as_str()), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_snapshot_payload(&body, symbols)
    }

    fn name(&self) -> &str {
        "Polygon"
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct SnapshotPayload {
    tickers: Option<Vec<TickerPayload>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerPayload {
    ticker: Option<String>,
    last_trade: Option<TradePayload>,
    prev_day: Option<DayPayload>,
    todays_change: Option<f64>,
    todays_change_perc: Option<f64>,
}

#[derive(Deserialize)]
struct TradePayload {
    p: Option<f64>,
}

#[derive(Deserialize)]
struct DayPayload {
    c: Option<f64>,
}

/// Parse a snapshot body into quotes ordered like `symbols`.
///
/// Tickers outside the watch-list are ignored; a watched ticker missing from
/// the payload rejects the whole payload. Duplicate tickers keep the last entry.
pub fn parse_snapshot_payload(body: &str, symbols: &[String]) -> Result<Vec<Quote>, FetchError> {
    let payload: SnapshotPayload =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let tickers = payload
        .tickers
        .ok_or_else(|| FetchError::Malformed("missing 'tickers' array".into()))?;
    if tickers.is_empty() {
        return Err(FetchError::Empty);
    }

    let wanted: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
    let mut parsed: HashMap<String, Quote> = HashMap::new();

    for entry in tickers {
        let symbol = entry
            .ticker
            .as_deref()
            .map(str::to_uppercase)
            .ok_or_else(|| FetchError::Malformed("ticker entry without symbol".into()))?;
        if !wanted.contains(&symbol) {
            continue;
        }

        // Last trade first, previous close when the last trade is absent or zero
        let price = entry
            .last_trade
            .and_then(|t| t.p)
            .filter(|p| *p > 0.0)
            .or_else(|| entry.prev_day.and_then(|d| d.c))
            .ok_or_else(|| FetchError::Malformed(format!("{symbol}: no price")))?;
        let price = to_decimal(&symbol, "price", price)?;
        if price.is_sign_negative() {
            return Err(FetchError::Malformed(format!("{symbol}: negative price {price}")));
        }

        let change = entry
            .todays_change
            .ok_or_else(|| FetchError::Malformed(format!("{symbol}: missing todaysChange")))?;
        let change_percent = entry
            .todays_change_perc
            .ok_or_else(|| FetchError::Malformed(format!("{symbol}: missing todaysChangePerc")))?;

        let quote = Quote::new(&symbol, price).with_change(
            to_decimal(&symbol, "todaysChange", change)?,
            to_decimal(&symbol, "todaysChangePerc", change_percent)?,
        );
        parsed.insert(symbol, quote);
    }

    // A snapshot covers the whole watch-list or it is not installed
    wanted
        .iter()
        .map(|s| {
            parsed
                .remove(s)
                .ok_or_else(|| FetchError::Malformed(format!("missing {s}")))
        })
        .collect()
}

fn to_decimal(symbol: &str, field: &str, value: f64) -> Result<Decimal, FetchError> {
    Decimal::from_f64(value)
        .ok_or_else(|| FetchError::Malformed(format!("{symbol}: {field} is not a finite number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn watch_list() -> Vec<String> {
        vec!["SPY".into(), "AGG".into(), "BIL".into()]
    }

    fn sample_payload() -> serde_json::Value {
        serde_json::json!({
            "status": "OK",
            "tickers": [
                {
                    "ticker": "AGG",
                    "lastTrade": { "p": 98.12 },
                    "prevDay": { "c": 98.00 },
                    "todaysChange": 0.12,
                    "todaysChangePerc": 0.122
                },
                {
                    "ticker": "SPY",
                    "lastTrade": { "p": 512.34 },
                    "todaysChange": -2.5,
                    "todaysChangePerc": -0.485
                },
                {
                    "ticker": "BIL",
                    "prevDay": { "c": 91.58 },
                    "todaysChange": 0.01,
                    "todaysChangePerc": 0.011
                },
                {
                    "ticker": "TSLA",
                    "lastTrade": { "p": 200.0 },
                    "todaysChange": 1.0,
                    "todaysChangePerc": 0.5
                }
            ]
        })
    }

    #[test]
    fn test_parse_orders_by_watch_list_and_skips_unwatched() {
        let quotes = parse_snapshot_payload(&sample_payload().to_string(), &watch_list()).unwrap();
        let symbols: Vec<_> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SPY", "AGG", "BIL"]);
        assert_eq!(quotes[0].price, dec!(512.34));
        assert_eq!(quotes[0].change_percent, dec!(-0.485));
    }

    #[test]
    fn test_parse_falls_back_to_previous_close() {
        let body = serde_json::json!({
            "tickers": [{
                "ticker": "bil",
                "lastTrade": { "p": 0.0 },
                "prevDay": { "c": 91.62 },
                "todaysChange": 0.0,
                "todaysChangePerc": 0.0
            }]
        });
        let quotes = parse_snapshot_payload(&body.to_string(), &["BIL".to_string()]).unwrap();
        assert_eq!(quotes[0].symbol, "BIL");
        assert_eq!(quotes[0].price, dec!(91.62));
    }

    #[test]
    fn test_parse_rejects_partial_watch_list() {
        let body = serde_json::json!({
            "tickers": [{
                "ticker": "SPY",
                "lastTrade": { "p": 512.34 },
                "todaysChange": 3.1,
                "todaysChangePerc": 0.61
            }]
        });
        let err = parse_snapshot_payload(&body.to_string(), &watch_list()).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(msg) if msg == "missing AGG"));
    }

    #[test]
    fn test_parse_rejects_missing_change() {
        let body = serde_json::json!({
            "tickers": [{ "ticker": "SPY", "lastTrade": { "p": 500.0 } }]
        });
        let err = parse_snapshot_payload(&body.to_string(), &watch_list()).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(msg) if msg.contains("todaysChange")));
    }

    #[test]
    fn test_parse_rejects_missing_price() {
        let body = serde_json::json!({
            "tickers": [{ "ticker": "SPY", "todaysChange": 1.0, "todaysChangePerc": 0.2 }]
        });
        assert!(matches!(
            parse_snapshot_payload(&body.to_string(), &watch_list()),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(matches!(
            parse_snapshot_payload(r#"{"tickers": []}"#, &watch_list()),
            Err(FetchError::Empty)
        ));
        assert!(matches!(
            parse_snapshot_payload(r#"{"status": "OK"}"#, &watch_list()),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_snapshot_payload("<html>", &watch_list()),
            Err(FetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_quotes_from_api() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/snapshot/locale/us/markets/stocks/tickers"))
            .and(query_param("tickers", "SPY,AGG,BIL"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_payload()))
            .mount(&mock_server)
            .await;

        let feed = PolygonFeed::new("test-key", mock_server.uri(), Duration::from_secs(5)).unwrap();
        let quotes = feed.fetch_quotes(&watch_list()).await.unwrap();
        assert_eq!(quotes.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_quotes_surfaces_status_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "status": "ERROR",
                "message": "Unknown API Key"
            })))
            .mount(&mock_server)
            .await;

        let feed = PolygonFeed::new("bad-key", mock_server.uri(), Duration::from_secs(5)).unwrap();
        match feed.fetch_quotes(&watch_list()).await {
            Err(FetchError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Unknown API Key");
            }
            other => panic!("Expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_without_key() {
        let config = EngineConfig::default();
        assert!(PolygonFeed::from_config(&config).unwrap().is_none());
    }
}
