//! Domain Models
//!
//! Market quotes, snapshots and the user's retirement profile.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// One symbol's latest market snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol (e.g., "SPY", "AGG")
    pub symbol: String,

    /// Last price in USD
    pub price: Decimal,

    /// Absolute change since previous close
    pub change: Decimal,

    /// Percentage change since previous close
    pub change_percent: Decimal,

    /// When this quote was fetched (or installed as fallback)
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_change(mut self, change: Decimal, change_percent: Decimal) -> Self {
        self.change = change;
        self.change_percent = change_percent;
        self
    }
}

/// Where a snapshot came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Compiled-in defaults, no successful refresh yet
    Fallback,
    /// Installed by a successful feed refresh
    Feed,
}

/// The complete set of latest quotes, replaced atomically
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub quotes: Vec<Quote>,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl Snapshot {
    /// Build a feed snapshot, stamping every quote with the same time
    pub fn from_feed(quotes: Vec<Quote>) -> Self {
        let fetched_at = Utc::now();
        let quotes = quotes
            .into_iter()
            .map(|q| Quote { fetched_at, ..q })
            .collect();
        Self {
            quotes,
            fetched_at,
            source: SnapshotSource::Feed,
        }
    }

    /// Static snapshot used until the first successful refresh
    pub fn fallback() -> Self {
        let fetched_at = Utc::now();
        let quotes = FALLBACK_QUOTES
            .iter()
            .map(|(symbol, price)| Quote {
                fetched_at,
                ..Quote::new(*symbol, *price)
            })
            .collect();
        Self {
            quotes,
            fetched_at,
            source: SnapshotSource::Fallback,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.quotes.iter().map(|q| q.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Broad market, aggregate bonds, T-bills: one proxy per allocation bucket
const FALLBACK_QUOTES: [(&str, Decimal); 3] = [
    ("SPY", dec!(500.00)),
    ("AGG", dec!(108.00)),
    ("BIL", dec!(91.50)),
];

/// User's stated risk appetite
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Moderate,
    High,
}

impl RiskTolerance {
    /// Parse any string, treating unrecognized values as moderate
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            other => Err(AdvisorError::InvalidProfile(format!(
                "unknown risk tolerance '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's risk and retirement parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub risk_tolerance: RiskTolerance,
    pub current_age: u32,
    pub target_retirement_age: u32,
    pub monthly_contribution: Decimal,
    pub retirement_goal: Decimal,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            risk_tolerance: RiskTolerance::Moderate,
            current_age: 30,
            target_retirement_age: 65,
            monthly_contribution: Decimal::ZERO,
            retirement_goal: Decimal::ZERO,
        }
    }
}

impl Profile {
    /// Boundary check; the allocation engine itself assumes a valid profile
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if self.current_age == 0 {
            return Err(AdvisorError::InvalidProfile("current age must be positive".into()));
        }
        if self.target_retirement_age <= self.current_age {
            return Err(AdvisorError::InvalidProfile(
                "target retirement age must be greater than current age".into(),
            ));
        }
        if self.monthly_contribution < Decimal::ZERO || self.retirement_goal < Decimal::ZERO {
            return Err(AdvisorError::InvalidProfile(
                "monetary amounts must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub const fn years_to_retirement(&self) -> u32 {
        self.target_retirement_age.saturating_sub(self.current_age)
    }

    pub fn annual_contribution(&self) -> Decimal {
        self.monthly_contribution * dec!(12)
    }
}

/// Target split across asset classes, in percent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub stocks: Decimal,
    pub bonds: Decimal,
    pub cash: Decimal,
}

impl AllocationResult {
    /// Sum of the three buckets; not guaranteed to be 100 after clamping
    pub fn total(&self) -> Decimal {
        self.stocks + self.bonds + self.cash
    }
}

impl std::fmt::Display for AllocationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stocks {}% / Bonds {}% / Cash {}%",
            self.stocks.normalize(),
            self.bonds.normalize(),
            self.cash.normalize()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_snapshot() {
        let snapshot = Snapshot::fallback();
        assert_eq!(snapshot.symbols(), vec!["SPY", "AGG", "BIL"]);
        assert_eq!(snapshot.source, SnapshotSource::Fallback);
        assert!(snapshot.quotes.iter().all(|q| q.change.is_zero() && q.change_percent.is_zero()));
        assert_eq!(snapshot.get("bil").unwrap().price, dec!(91.50));
    }

    #[test]
    fn test_risk_tolerance_parsing() {
        assert_eq!("HIGH".parse::<RiskTolerance>().unwrap(), RiskTolerance::High);
        assert!("yolo".parse::<RiskTolerance>().is_err());
        assert_eq!(RiskTolerance::parse_lenient("yolo"), RiskTolerance::Moderate);
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = Profile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.years_to_retirement(), 35);

        profile.target_retirement_age = 30;
        assert!(profile.validate().is_err());

        profile.target_retirement_age = 65;
        profile.monthly_contribution = dec!(-1);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_annual_contribution() {
        let profile = Profile {
            monthly_contribution: dec!(500),
            ..Profile::default()
        };
        assert_eq!(profile.annual_contribution(), dec!(6000));
    }
}
