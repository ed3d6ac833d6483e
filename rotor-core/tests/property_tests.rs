//! Property-based tests for the decision math.
//!
//! These encode the invariants the pipeline leans on: the sizer can never
//! short or overspend, the weight policy sums to exactly one or zero, and
//! ranking is deterministic.

use proptest::prelude::*;
use std::collections::HashMap;

use rotor_core::domain::{Position, TradeAction};
use rotor_core::momentum::{assign_target_weights, rank_by_momentum, MomentumConfig};
use rotor_core::sizing::{PositionSizer, SizerConfig};

fn position(symbol: &str, quantity: f64, price: f64) -> Position {
    Position {
        symbol: symbol.into(),
        quantity,
        avg_cost: price,
        market_price: price,
        market_value: quantity * price,
        unrealized_pnl: 0.0,
    }
}

/// Universe-shaped symbol pool for generated portfolios.
const SYMBOLS: [&str; 5] = ["SXLK.L", "SXLF.L", "SXLE.L", "SXLV.L", "SXLU.L"];

prop_compose! {
    fn arb_holdings()(
        quantities in prop::collection::vec(0u32..500, SYMBOLS.len()),
        prices in prop::collection::vec(10.0f64..500.0, SYMBOLS.len()),
    ) -> (HashMap<String, Position>, HashMap<String, f64>) {
        let mut positions = HashMap::new();
        let mut price_map = HashMap::new();
        for ((symbol, qty), price) in SYMBOLS.iter().zip(quantities).zip(prices) {
            if qty > 0 {
                positions.insert(symbol.to_string(), position(symbol, qty as f64, price));
            }
            price_map.insert(symbol.to_string(), price);
        }
        (positions, price_map)
    }
}

prop_compose! {
    fn arb_targets()(
        raw in prop::collection::vec(0.0f64..0.4, SYMBOLS.len()),
    ) -> HashMap<String, f64> {
        SYMBOLS
            .iter()
            .zip(raw)
            .map(|(s, w)| (s.to_string(), w))
            .collect()
    }
}

proptest! {
    /// The sizer never proposes selling more than is held.
    #[test]
    fn never_sells_more_than_held(
        (positions, prices) in arb_holdings(),
        targets in arb_targets(),
        cash in 0.0f64..200_000.0,
    ) {
        let equity: f64 =
            cash + positions.values().map(|p| p.market_value).sum::<f64>();
        let sizer = PositionSizer::new(equity, cash, positions.clone(), SizerConfig::default());

        for trade in sizer.generate_trades(&targets, &prices) {
            if trade.action == TradeAction::Sell {
                let held = positions
                    .get(&trade.symbol)
                    .map(|p| p.quantity)
                    .unwrap_or(0.0);
                prop_assert!(trade.shares as f64 <= held + 1e-9);
            }
        }
    }

    /// No buy's resulting weight (at proposal price) exceeds the position cap.
    #[test]
    fn buys_respect_position_cap(
        (positions, prices) in arb_holdings(),
        targets in arb_targets(),
        cash in 0.0f64..200_000.0,
    ) {
        let equity: f64 =
            cash + positions.values().map(|p| p.market_value).sum::<f64>();
        prop_assume!(equity > 0.0);
        let cfg = SizerConfig::default();
        let cap = cfg.max_position_pct;
        let sizer = PositionSizer::new(equity, cash, positions.clone(), cfg);

        for trade in sizer.generate_trades(&targets, &prices) {
            if trade.action == TradeAction::Buy {
                let current = positions
                    .get(&trade.symbol)
                    .map(|p| p.market_value)
                    .unwrap_or(0.0);
                let resulting = (current + trade.trade_value) / equity;
                prop_assert!(resulting <= cap + 1e-9,
                    "{}: resulting weight {resulting} above cap", trade.symbol);
            }
        }
    }

    /// Cash feasibility: total buy cost never exceeds cash plus sell proceeds.
    #[test]
    fn batches_are_cash_feasible(
        (positions, prices) in arb_holdings(),
        targets in arb_targets(),
        cash in 0.0f64..100_000.0,
    ) {
        let equity: f64 =
            cash + positions.values().map(|p| p.market_value).sum::<f64>();
        let sizer = PositionSizer::new(equity, cash, positions, SizerConfig::default());

        let trades = sizer.generate_trades(&targets, &prices);
        let sell_proceeds: f64 = trades
            .iter()
            .filter(|t| t.action == TradeAction::Sell)
            .map(|t| t.trade_value)
            .sum();
        let buy_cost: f64 = trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .map(|t| t.trade_value)
            .sum();

        prop_assert!(buy_cost <= cash + sell_proceeds + 1e-6);
    }

    /// Sells always precede buys in the generated batch.
    #[test]
    fn sells_ordered_before_buys(
        (positions, prices) in arb_holdings(),
        targets in arb_targets(),
        cash in 0.0f64..100_000.0,
    ) {
        let equity: f64 =
            cash + positions.values().map(|p| p.market_value).sum::<f64>();
        let sizer = PositionSizer::new(equity, cash, positions, SizerConfig::default());

        let trades = sizer.generate_trades(&targets, &prices);
        let mut seen_buy = false;
        for trade in &trades {
            match trade.action {
                TradeAction::Buy => seen_buy = true,
                TradeAction::Sell => prop_assert!(!seen_buy, "sell after buy"),
            }
        }
    }

    /// Target weights sum to exactly 1.0 when anything is eligible, 0 otherwise.
    #[test]
    fn weight_sums_are_one_or_zero(
        momentum in prop::collection::vec(-0.6f64..0.6, 1..9),
    ) {
        let entries: Vec<(String, f64)> = momentum
            .iter()
            .enumerate()
            .map(|(i, &m)| (format!("S{i}.L"), m))
            .collect();

        let cfg = MomentumConfig::default();
        let mut rankings = rank_by_momentum(entries);
        assign_target_weights(&mut rankings, &cfg);

        let sum: f64 = rankings.iter().map(|r| r.target_weight).sum();
        let any_eligible = rankings
            .iter()
            .any(|r| r.rank <= cfg.top_n && r.momentum >= cfg.min_momentum);

        if any_eligible {
            prop_assert!((sum - 1.0).abs() < 1e-9, "sum {sum}");
        } else {
            prop_assert_eq!(sum, 0.0);
        }

        // Non-selected rows carry exactly zero.
        for r in &rankings {
            if r.rank > cfg.top_n || r.momentum < cfg.min_momentum {
                prop_assert_eq!(r.target_weight, 0.0);
            }
        }
    }

    /// Ranking the same inputs twice is bit-identical.
    #[test]
    fn ranking_is_deterministic(
        momentum in prop::collection::vec(-0.5f64..0.5, 1..9),
    ) {
        let entries: Vec<(String, f64)> = momentum
            .iter()
            .enumerate()
            .map(|(i, &m)| (format!("S{i}.L"), m))
            .collect();

        let a = rank_by_momentum(entries.clone());
        let b = rank_by_momentum(entries);
        for (ra, rb) in a.iter().zip(&b) {
            prop_assert_eq!(&ra.symbol, &rb.symbol);
            prop_assert_eq!(ra.rank, rb.rank);
            prop_assert!(ra.momentum.to_bits() == rb.momentum.to_bits());
        }
    }
}
