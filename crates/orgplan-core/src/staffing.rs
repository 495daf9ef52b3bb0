//! Staffing estimation.
//!
//! Converts a scope size, a budget and a domain into per-level headcounts.
//! The estimate is a pure function:
//!
//! - every level gets at least one seat
//! - a larger scope never shrinks any level at the same budget and domain
//! - a larger budget never shrinks managers or ICs at the same scope and
//!   domain
//! - regulated domains get one extra manager for oversight

use serde::{Deserialize, Serialize};

/// Budget thresholds (USD) at which the IC and manager pools grow.
const BUDGET_TIERS_USD: [f64; 3] = [50.0, 200.0, 1000.0];

/// Domains that warrant an extra manager.
const REGULATED_DOMAINS: [&str; 6] = ["finance", "fintech", "health", "healthcare", "legal", "insurance"];

/// Coarse project size, derived from the number of objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeSize {
    Small,
    Medium,
    Large,
}

impl ScopeSize {
    /// Up to two objectives is small, up to five medium, more is large. An
    /// empty objective list counts as one.
    pub fn from_objective_count(count: usize) -> Self {
        match count.max(1) {
            1..=2 => Self::Small,
            3..=5 => Self::Medium,
            _ => Self::Large,
        }
    }
}

/// Headcount per level below the fixed board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staffing {
    pub vp: usize,
    pub director: usize,
    pub manager: usize,
    pub ic: usize,
}

/// Estimate headcounts for a project.
pub fn estimate(scope: ScopeSize, budget_usd: f64, domain: &str) -> Staffing {
    let mut staffing = match scope {
        ScopeSize::Small => Staffing {
            vp: 1,
            director: 1,
            manager: 1,
            ic: 2,
        },
        ScopeSize::Medium => Staffing {
            vp: 1,
            director: 2,
            manager: 2,
            ic: 4,
        },
        ScopeSize::Large => Staffing {
            vp: 2,
            director: 3,
            manager: 4,
            ic: 8,
        },
    };

    let tier = budget_tier(budget_usd);
    staffing.ic += 2 * tier;
    staffing.manager += tier.div_ceil(2);

    if is_regulated(domain) {
        staffing.manager += 1;
    }
    staffing
}

/// Number of budget thresholds met. Non-finite budgets count as zero.
fn budget_tier(budget_usd: f64) -> usize {
    if !budget_usd.is_finite() {
        return 0;
    }
    BUDGET_TIERS_USD.iter().filter(|&&t| budget_usd >= t).count()
}

fn is_regulated(domain: &str) -> bool {
    let d = domain.trim().to_lowercase();
    REGULATED_DOMAINS.contains(&d.as_str())
}
