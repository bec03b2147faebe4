//! Allocation Engine
//!
//! Maps a risk tolerance and age to a stocks/bonds/cash split. Pure and
//! deterministic: the same inputs always give the same triple.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Base table           stocks  bonds  cash    │
//! │  low                    40     50     10     │
//! │  moderate               60     35      5     │
//! │  high                   80     15      5     │
//! ├──────────────────────────────────────────────┤
//! │  age shift = clamp(age - 30, 0, 30) / 2      │
//! │  stocks - shift (floor 20)                   │
//! │  bonds  + shift (ceiling 70)                 │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The buckets are not re-normalized after clamping, so at the clamp
//! boundaries they may not sum to exactly 100.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::{AllocationResult, Profile, RiskTolerance};

const STOCKS_FLOOR: Decimal = dec!(20);
const BONDS_CEILING: Decimal = dec!(70);

/// Age at which the glide path starts
const GLIDE_START_AGE: u32 = 30;
/// Years over which the shift grows before flattening out
const GLIDE_YEARS: u32 = 30;

/// Base (stocks, bonds, cash) for a risk tier
pub const fn base_allocation(tolerance: RiskTolerance) -> (Decimal, Decimal, Decimal) {
    match tolerance {
        RiskTolerance::Low => (dec!(40), dec!(50), dec!(10)),
        RiskTolerance::Moderate => (dec!(60), dec!(35), dec!(5)),
        RiskTolerance::High => (dec!(80), dec!(15), dec!(5)),
    }
}

/// Percentage points moved from stocks to bonds at a given age
pub fn age_adjustment(current_age: u32) -> Decimal {
    let years = current_age.saturating_sub(GLIDE_START_AGE).min(GLIDE_YEARS);
    Decimal::from(years) / dec!(2)
}

/// Recommended split for a tolerance and age
pub fn recommend(tolerance: RiskTolerance, current_age: u32) -> AllocationResult {
    let (stocks, bonds, cash) = base_allocation(tolerance);
    let adj = age_adjustment(current_age);

    AllocationResult {
        stocks: (stocks - adj).max(STOCKS_FLOOR),
        bonds: (bonds + adj).min(BONDS_CEILING),
        cash,
    }
}

/// Recommended split for a stored profile
pub fn recommend_for(profile: &Profile) -> AllocationResult {
    recommend(profile.risk_tolerance, profile.current_age)
}
