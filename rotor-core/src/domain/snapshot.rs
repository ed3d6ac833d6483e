//! Portfolio snapshot — broker-reported state consumed read-only by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single broker-reported position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub market_price: f64,
    pub market_value: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
}

/// Point-in-time portfolio state as reported by the broker.
///
/// Produced externally (broker query, saved as dated JSON) and consumed
/// read-only. `total_equity` is the broker's net liquidation value, which
/// may differ slightly from `cash + sum(market values)` because of margin
/// and unsettled cash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_equity: f64,
    pub cash: f64,
    pub positions: Vec<Position>,
}

/// Outcome of the snapshot integrity check.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotIntegrity {
    Ok,
    /// Equity well above cash but zero positions reported: the upstream
    /// fetch almost certainly returned an empty position list.
    MissingPositions { missing_value: f64 },
}

impl PortfolioSnapshot {
    /// Age of the snapshot in hours relative to `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_seconds() as f64 / 3600.0
    }

    /// Current portfolio weight per held symbol (market value / equity).
    pub fn current_weights(&self) -> HashMap<String, f64> {
        if self.total_equity <= 0.0 {
            return HashMap::new();
        }
        self.positions
            .iter()
            .filter(|p| p.market_value != 0.0)
            .map(|p| (p.symbol.clone(), p.market_value / self.total_equity))
            .collect()
    }

    /// Market value per held symbol.
    pub fn position_values(&self) -> HashMap<String, f64> {
        self.positions
            .iter()
            .map(|p| (p.symbol.clone(), p.market_value))
            .collect()
    }

    /// Detect the known upstream failure mode: equity reported, no positions
    /// loaded, and equity more than 10% above cash.
    pub fn integrity(&self) -> SnapshotIntegrity {
        if self.total_equity > 0.0
            && self.positions.is_empty()
            && self.total_equity > self.cash * 1.1
        {
            SnapshotIntegrity::MissingPositions {
                missing_value: self.total_equity - self.cash,
            }
        } else {
            SnapshotIntegrity::Ok
        }
    }
}
