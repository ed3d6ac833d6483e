//! Ranked momentum signal — output of one signal computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the ranked signal: a sector ETF with its momentum and weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorRanking {
    pub symbol: String,
    /// 12-1 momentum as a decimal return (0.08 = +8%).
    pub momentum: f64,
    /// 1 = highest momentum. Ties keep universe declaration order.
    pub rank: usize,
    /// `1/|eligible|` for selected sectors, exactly 0 otherwise.
    pub target_weight: f64,
}

/// Complete momentum signal for one as-of date.
///
/// Rebuilt from scratch on every invocation; never mutated in place. When no
/// sector clears the momentum floor every weight is zero and `top_sectors`
/// is empty — a deliberate 100%-cash stance, distinct from a data failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumSignal {
    pub signal_date: NaiveDate,
    /// All ranked sectors, best first.
    pub rankings: Vec<SectorRanking>,
    /// Symbols with non-zero target weight, in rank order.
    pub top_sectors: Vec<String>,
    pub top_n: usize,
}

impl MomentumSignal {
    /// Target weight per symbol (zero-weight rows included).
    pub fn target_weights(&self) -> HashMap<String, f64> {
        self.rankings
            .iter()
            .map(|r| (r.symbol.clone(), r.target_weight))
            .collect()
    }

    /// Rank for a symbol, if it was ranked.
    pub fn rank_of(&self, symbol: &str) -> Option<usize> {
        self.rankings
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| r.rank)
    }

    /// True when the signal allocates nothing (full-cash stance).
    pub fn is_all_cash(&self) -> bool {
        self.top_sectors.is_empty()
    }
}
