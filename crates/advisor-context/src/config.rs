//! Engine Configuration
//!
//! All tunables are read from the environment at startup.

use std::time::Duration;

use crate::error::{AdvisorError, Result};

/// Default Polygon.io REST base
pub const POLYGON_BASE_URL: &str = "https://api.polygon.io/v2";

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Tracked ticker symbols, in display order
    pub watch_list: Vec<String>,

    /// Period of the background market refresh
    pub refresh_interval: Duration,

    /// Upper bound on a single upstream fetch; must be below `refresh_interval`
    pub fetch_timeout: Duration,

    /// Number of similar turns pulled into each context
    pub retrieval_k: usize,

    /// Minimum cosine similarity for a turn to count as relevant
    pub match_threshold: f32,

    /// Dimensionality every embedding must have
    pub embedding_dimensions: usize,

    /// Polygon API key; no key means fallback quotes only
    pub polygon_api_key: Option<String>,

    pub polygon_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watch_list: vec!["SPY".into(), "AGG".into(), "BIL".into()],
            refresh_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            retrieval_k: 5,
            match_threshold: 0.75,
            embedding_dimensions: 768,
            polygon_api_key: None,
            polygon_base_url: POLYGON_BASE_URL.into(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, falling back to defaults for absent keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let watch_list = lookup("ADVISOR_WATCH_LIST").map_or(defaults.watch_list, |raw| {
            raw.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let config = Self {
            watch_list,
            refresh_interval: parse_var(&lookup, "ADVISOR_REFRESH_SECS")?
                .map_or(defaults.refresh_interval, Duration::from_secs),
            fetch_timeout: parse_var(&lookup, "ADVISOR_FETCH_TIMEOUT_SECS")?
                .map_or(defaults.fetch_timeout, Duration::from_secs),
            retrieval_k: parse_var(&lookup, "ADVISOR_RETRIEVAL_K")?.unwrap_or(defaults.retrieval_k),
            match_threshold: parse_var(&lookup, "ADVISOR_MATCH_THRESHOLD")?
                .unwrap_or(defaults.match_threshold),
            embedding_dimensions: parse_var(&lookup, "ADVISOR_EMBEDDING_DIMENSIONS")?
                .unwrap_or(defaults.embedding_dimensions),
            polygon_api_key: lookup("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            polygon_base_url: lookup("POLYGON_BASE_URL").unwrap_or(defaults.polygon_base_url),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch_list.is_empty() {
            return Err(AdvisorError::Config("watch-list must not be empty".into()));
        }
        if self.refresh_interval.is_zero() {
            return Err(AdvisorError::Config("refresh interval must be positive".into()));
        }
        if self.fetch_timeout >= self.refresh_interval {
            return Err(AdvisorError::Config(format!(
                "fetch timeout {:?} must be shorter than refresh interval {:?}",
                self.fetch_timeout, self.refresh_interval
            )));
        }
        if self.retrieval_k == 0 {
            return Err(AdvisorError::Config("retrieval k must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(AdvisorError::Config(format!(
                "match threshold {} outside [-1, 1]",
                self.match_threshold
            )));
        }
        if self.embedding_dimensions == 0 {
            return Err(AdvisorError::Config("embedding dimensions must be positive".into()));
        }
        Ok(())
    }

    pub const fn feed_configured(&self) -> bool {
        self.polygon_api_key.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| AdvisorError::Config(format!("{key} has invalid value '{raw}'")))
        })
        .transpose()
}
