//! End-to-end context pipeline tests
//!
//! Wires a mocked Polygon upstream, an in-memory turn log and a keyword
//! embedder through the public API only.

use std::sync::Arc;
use std::time::Duration;

use advisor_context::{
    ContextAssembler, EngineConfig, MarketDataCache, PolygonFeed, SnapshotSource, VectorStore,
};
use advisor_core::{Embedder, EmbeddingError, MemoryTurnLog, Turn, TurnLog};
use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SNAPSHOT_PATH: &str = "/snapshot/locale/us/markets/stocks/tickers";

/// Counts topic words: [stocks, bonds, retirement]
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lower = text.to_lowercase();
        let count = |word: &str| lower.matches(word).count() as f32;
        Ok(vec![count("stock"), count("bond"), count("retire")])
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "topic"
    }
}

fn config_for(server: &MockServer) -> EngineConfig {
    EngineConfig {
        polygon_api_key: Some("test-key".into()),
        polygon_base_url: server.uri(),
        embedding_dimensions: 3,
        ..EngineConfig::default()
    }
}

fn snapshot_body() -> serde_json::Value {
    json!({
        "status": "OK",
        "tickers": [
            {
                "ticker": "SPY",
                "lastTrade": { "p": 512.4 },
                "prevDay": { "c": 509.3 },
                "todaysChange": 3.1,
                "todaysChangePerc": 0.6123
            },
            {
                "ticker": "AGG",
                "lastTrade": { "p": 0.0 },
                "prevDay": { "c": 98.15 },
                "todaysChange": -0.35,
                "todaysChangePerc": -0.3571
            },
            {
                "ticker": "BIL",
                "prevDay": { "c": 91.58 },
                "todaysChange": 0.0,
                "todaysChangePerc": 0.0
            }
        ]
    })
}

async fn build(server: &MockServer) -> (ContextAssembler, Arc<MemoryTurnLog>, EngineConfig) {
    let config = config_for(server);
    let feed = PolygonFeed::from_config(&config).unwrap().unwrap();
    let cache = Arc::new(MarketDataCache::new(Arc::new(feed), config.fetch_timeout));
    let store = Arc::new(VectorStore::from_config(Arc::new(TopicEmbedder), &config));
    let log = Arc::new(MemoryTurnLog::new());
    let assembler =
        ContextAssembler::new(cache, store, log.clone()).with_retrieval_k(config.retrieval_k);
    (assembler, log, config)
}

#[tokio::test]
async fn test_new_user_sees_fallback_quotes_and_empty_history() {
    let server = MockServer::start().await;
    let (assembler, _log, _config) = build(&server).await;

    let context = assembler.build_context("u1", "How should I invest for retirement?").await;

    assert_eq!(
        context,
        "Current Market Data:\n\
         SPY: $500.00 (0.00%)\n\
         AGG: $108.00 (0.00%)\n\
         BIL: $91.50 (0.00%)\n\
         \n\
         Previous Conversations:\n"
    );
}

#[tokio::test]
async fn test_refreshed_quotes_flow_into_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SNAPSHOT_PATH))
        .and(query_param("tickers", "SPY,AGG,BIL"))
        .and(query_param("apiKey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (assembler, _log, config) = build(&server).await;
    let snapshot = assembler.market().refresh(&config.watch_list).await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Feed);

    let context = assembler.build_context("u1", "anything").await;
    assert!(context.contains("SPY: $512.40 (+0.61%)"));
    assert!(context.contains("AGG: $98.15 (-0.36%)"));
    assert!(context.contains("BIL: $91.58 (0.00%)"));
}

#[tokio::test]
async fn test_malformed_upstream_keeps_serving_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SNAPSHOT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tickers": [{ "ticker": "SPY", "lastTrade": { "p": 512.4 } }]
        })))
        .mount(&server)
        .await;

    let (assembler, _log, config) = build(&server).await;
    assert!(assembler.market().refresh(&config.watch_list).await.is_err());

    let context = assembler.build_context("u1", "anything").await;
    assert!(context.contains("SPY: $500.00 (0.00%)"));
}

#[tokio::test]
async fn test_history_is_scoped_and_ranked() {
    let server = MockServer::start().await;
    let (assembler, log, _config) = build(&server).await;

    for (user, text) in [
        ("u1", "I hold mostly bond funds"),
        ("u1", "Stocks feel risky to me"),
        ("u2", "Should my bond ladder be longer?"),
    ] {
        assembler.record_turn(Turn::user(user, text)).await.unwrap().await.unwrap();
    }
    assert_eq!(log.list_recent("u1", 10).await.unwrap().len(), 2);

    let context = assembler.build_context("u1", "what about bonds?").await;
    let (_, history) = context.split_once("Previous Conversations:\n").unwrap();
    assert_eq!(history, "I hold mostly bond funds");

    let fresh = assembler.build_context("u3", "what about bonds?").await;
    assert!(fresh.ends_with("Previous Conversations:\n"));
}

#[tokio::test]
async fn test_restart_warm_up_restores_retrieval() {
    let server = MockServer::start().await;
    let (assembler, log, config) = build(&server).await;
    assembler
        .record_turn(Turn::user("u1", "Planning to retire at 60"))
        .await
        .unwrap()
        .await
        .unwrap();

    // A new store over the same log, as after a process restart
    let store = VectorStore::from_config(Arc::new(TopicEmbedder), &config);
    assert_eq!(store.len_for("u1"), 0);
    let indexed = store.warm_up(log.as_ref(), "u1", 100).await.unwrap();
    assert_eq!(indexed, 1);

    let similar = store.query_similar("u1", "retirement age", 5).await;
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].content, "Planning to retire at 60");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_refresh_updates_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SNAPSHOT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;

    let (assembler, _log, config) = build(&server).await;
    let handle = assembler
        .market()
        .spawn_refresh_loop(config.watch_list.clone(), Duration::from_secs(60));

    // The first tick fires immediately
    let mut refreshed = false;
    for _ in 0..50 {
        if assembler.market().get_latest().source == SnapshotSource::Feed {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.shutdown().await;
    assert!(refreshed);
}
