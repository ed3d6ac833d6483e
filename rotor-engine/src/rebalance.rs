//! Rebalance preview — the proposed trade list without execution.
//!
//! Runs the signal and the sizer against the latest snapshot and returns
//! the trades a run would propose. No risk validation, no journaling, no
//! submission: this is the "what would happen" view for manual execution.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use rotor_core::data::PriceProvider;
use rotor_core::domain::{MomentumSignal, SizedTrade};
use rotor_core::momentum::{generate_signal, SignalError};
use rotor_core::sizing::PositionSizer;
use rotor_core::universe::Universe;

use crate::config::AppConfig;
use crate::snapshots::{SnapshotError, SnapshotStore};

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("no portfolio snapshot found — run `rotor snapshot` first")]
    NoSnapshot,
}

/// The proposed rebalance for one point in time.
#[derive(Debug, Clone)]
pub struct RebalancePreview {
    pub date: chrono::NaiveDate,
    pub signal: MomentumSignal,
    pub trades: Vec<SizedTrade>,
    pub current_weights: HashMap<String, f64>,
    pub total_equity: f64,
    pub cash: f64,
}

/// Compute the rebalance preview.
pub fn generate_rebalance_preview(
    config: &AppConfig,
    universe: &Universe,
    provider: &dyn PriceProvider,
    now: DateTime<Utc>,
) -> Result<RebalancePreview, RebalanceError> {
    let snapshots = SnapshotStore::new(config.paths.snapshots.clone());
    let snapshot = snapshots.load_latest()?.ok_or(RebalanceError::NoSnapshot)?;

    let signal = generate_signal(
        provider,
        &universe.symbols(),
        now.date_naive(),
        &config.momentum_config(),
    )?;
    let target_weights = signal.target_weights();

    let positions: HashMap<String, _> = snapshot
        .positions
        .iter()
        .map(|p| (universe.normalize_symbol(&p.symbol), p.clone()))
        .collect();

    let mut symbols: Vec<&String> = target_weights.keys().chain(positions.keys()).collect();
    symbols.sort();
    symbols.dedup();

    let mut prices = HashMap::new();
    for symbol in symbols {
        match provider.latest_price(symbol) {
            Ok(price) if price > 0.0 => {
                prices.insert(symbol.clone(), price);
            }
            Ok(_) | Err(_) => {
                log::warn!("{symbol}: no valid price for preview");
            }
        }
    }

    let current_weights: HashMap<String, f64> = if snapshot.total_equity > 0.0 {
        positions
            .iter()
            .map(|(s, p)| (s.clone(), p.market_value / snapshot.total_equity))
            .collect()
    } else {
        HashMap::new()
    };

    let sizer = PositionSizer::new(
        snapshot.total_equity,
        snapshot.cash,
        positions,
        config.sizer_config(),
    );
    let trades = sizer.generate_trades(&target_weights, &prices);

    Ok(RebalancePreview {
        date: now.date_naive(),
        signal,
        trades,
        current_weights,
        total_equity: snapshot.total_equity,
        cash: snapshot.cash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotor_core::data::SyntheticProvider;
    use rotor_core::domain::{PortfolioSnapshot, Position};
    use tempfile::TempDir;

    #[test]
    fn preview_against_all_cash_snapshot_proposes_buys_only() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.snapshots = dir.path().join("snapshots");

        std::fs::create_dir_all(&config.paths.snapshots).unwrap();
        let snapshot = PortfolioSnapshot {
            timestamp: Utc::now(),
            total_equity: 100_000.0,
            cash: 100_000.0,
            positions: vec![],
        };
        std::fs::write(
            config.paths.snapshots.join("2025-06-02.json"),
            serde_json::to_string(&snapshot).unwrap(),
        )
        .unwrap();

        let universe = Universe::default_uk_sectors();
        let provider = SyntheticProvider::new(42);
        let preview =
            generate_rebalance_preview(&config, &universe, &provider, Utc::now()).unwrap();

        assert_eq!(preview.total_equity, 100_000.0);
        assert!(preview.trades.iter().all(|t| t.is_buy()));
        assert!(preview.current_weights.is_empty());
    }

    #[test]
    fn preview_without_snapshot_errors() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.snapshots = dir.path().join("missing");

        let universe = Universe::default_uk_sectors();
        let provider = SyntheticProvider::new(42);
        let err = generate_rebalance_preview(&config, &universe, &provider, Utc::now())
            .unwrap_err();
        assert!(matches!(err, RebalanceError::NoSnapshot));
    }

    #[test]
    fn preview_sells_dropped_holdings() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.snapshots = dir.path().join("snapshots");

        std::fs::create_dir_all(&config.paths.snapshots).unwrap();
        // A holding outside the universe can never be a target: it must show
        // up as a sell (broker symbol without the suffix, on purpose).
        let snapshot = PortfolioSnapshot {
            timestamp: Utc::now(),
            total_equity: 100_000.0,
            cash: 70_000.0,
            positions: vec![Position {
                symbol: "LGCY".into(),
                quantity: 100.0,
                avg_cost: 300.0,
                market_price: 300.0,
                market_value: 30_000.0,
                unrealized_pnl: 0.0,
            }],
        };
        std::fs::write(
            config.paths.snapshots.join("2025-06-02.json"),
            serde_json::to_string(&snapshot).unwrap(),
        )
        .unwrap();

        let universe = Universe::default_uk_sectors();
        let provider = SyntheticProvider::new(42);
        let preview =
            generate_rebalance_preview(&config, &universe, &provider, Utc::now()).unwrap();

        let sell = preview
            .trades
            .iter()
            .find(|t| t.symbol == "LGCY.L")
            .expect("legacy holding should be sold");
        assert!(sell.is_sell());
        assert_eq!(sell.shares, 100);
    }
}
