//! Position sizing — target weights to cash-feasible share trades.
//!
//! Share counts always round down: the sizer never over-allocates. Sells are
//! emitted before buys so callers realize cash before spending it, and the
//! buy list is reduced to fit available cash in conviction order.

use crate::domain::{Position, SizedTrade, TradeAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sizing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizerConfig {
    /// Minimum |target - current| weight difference to trigger a trade.
    pub min_trade_threshold: f64,
    /// Dust filter: minimum shares per trade.
    pub min_trade_shares: i64,
    /// Dust filter: minimum notional per trade.
    pub min_trade_value: f64,
    /// Hard per-instrument cap, applied before sizing.
    pub max_position_pct: f64,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            min_trade_threshold: 0.02,
            min_trade_shares: 1,
            min_trade_value: 100.0,
            max_position_pct: 0.25,
        }
    }
}

/// Converts target weights plus current holdings into concrete trades.
pub struct PositionSizer {
    total_equity: f64,
    cash: f64,
    positions: HashMap<String, Position>,
    cfg: SizerConfig,
}

impl PositionSizer {
    pub fn new(
        total_equity: f64,
        cash: f64,
        positions: HashMap<String, Position>,
        cfg: SizerConfig,
    ) -> Self {
        log::debug!(
            "sizer: equity={total_equity:.2}, cash={cash:.2}, positions={}",
            positions.len()
        );
        Self {
            total_equity,
            cash,
            positions,
            cfg,
        }
    }

    /// Current portfolio weight for a symbol (0 if unheld or equity <= 0).
    pub fn current_weight(&self, symbol: &str) -> f64 {
        if self.total_equity <= 0.0 {
            return 0.0;
        }
        self.positions
            .get(symbol)
            .map(|p| p.market_value / self.total_equity)
            .unwrap_or(0.0)
    }

    /// Shares currently held for a symbol.
    pub fn current_shares(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map(|p| p.quantity).unwrap_or(0.0)
    }

    /// Absolute share count needed to reach the target weight.
    ///
    /// The target is capped at `max_position_pct` before sizing, so the
    /// sizer never proposes a buy the risk manager would reject on the
    /// position limit. Floor, never round: never over-allocate.
    pub fn target_shares(&self, symbol: &str, target_weight: f64, price: f64) -> i64 {
        if price <= 0.0 {
            log::warn!("{symbol}: invalid price {price}, sizing to zero");
            return 0;
        }

        let effective_weight = target_weight.min(self.cfg.max_position_pct);
        if effective_weight < target_weight {
            log::info!(
                "{symbol}: target {:.1}% capped to {:.1}%",
                target_weight * 100.0,
                effective_weight * 100.0
            );
        }

        let target_value = self.total_equity * effective_weight;
        ((target_value / price).floor() as i64).max(0)
    }

    /// Trade needed to move one symbol from current to target weight.
    ///
    /// Returns `None` when the weight difference is inside the threshold,
    /// the price is unusable, or the resulting trade is dust.
    pub fn size_trade(&self, symbol: &str, target_weight: f64, price: f64) -> Option<SizedTrade> {
        let current_weight = self.current_weight(symbol);
        let current_shares = self.current_shares(symbol);
        let weight_diff = target_weight - current_weight;

        if weight_diff.abs() < self.cfg.min_trade_threshold {
            log::debug!(
                "{symbol}: within threshold ({:+.2}%), no trade",
                weight_diff * 100.0
            );
            return None;
        }

        if price <= 0.0 {
            log::warn!("{symbol}: no valid price, skipping");
            return None;
        }

        let shares_diff = self.target_shares(symbol, target_weight, price) as f64 - current_shares;

        let (action, shares) = if shares_diff > 0.0 {
            (TradeAction::Buy, shares_diff.floor() as i64)
        } else if shares_diff < 0.0 {
            // Cannot sell more than held — no shorting.
            let sellable = (-shares_diff).min(current_shares);
            (TradeAction::Sell, sellable.floor() as i64)
        } else {
            return None;
        };

        let trade_value = shares as f64 * price;
        if shares < self.cfg.min_trade_shares {
            log::debug!("{symbol}: trade of {shares} shares below minimum");
            return None;
        }
        if trade_value < self.cfg.min_trade_value {
            log::debug!("{symbol}: trade value {trade_value:.2} below minimum");
            return None;
        }

        Some(SizedTrade {
            symbol: symbol.to_string(),
            action,
            shares,
            price,
            target_weight,
            current_weight,
            trade_value,
            reason: format!(
                "Weight {:.1}% -> {:.1}%",
                current_weight * 100.0,
                target_weight * 100.0
            ),
        })
    }

    /// Generate the full trade list: sells first (largest value first), then
    /// buys (highest conviction first), reduced to fit available cash.
    pub fn generate_trades(
        &self,
        target_weights: &HashMap<String, f64>,
        current_prices: &HashMap<String, f64>,
    ) -> Vec<SizedTrade> {
        let mut symbols: Vec<&String> = target_weights
            .keys()
            .chain(self.positions.keys())
            .collect();
        symbols.sort();
        symbols.dedup();

        let mut sells = Vec::new();
        let mut buys = Vec::new();

        for symbol in symbols {
            let target = target_weights.get(symbol).copied().unwrap_or(0.0);
            let mut price = current_prices.get(symbol).copied().unwrap_or(0.0);

            // Fall back to the snapshot's mark when the live quote is missing.
            if price <= 0.0 {
                if let Some(pos) = self.positions.get(symbol) {
                    price = pos.market_price;
                }
            }

            if let Some(trade) = self.size_trade(symbol, target, price) {
                match trade.action {
                    TradeAction::Sell => sells.push(trade),
                    TradeAction::Buy => buys.push(trade),
                }
            }
        }

        // Largest sells first: frees the most cash fastest.
        sells.sort_by(|a, b| {
            b.trade_value
                .partial_cmp(&a.trade_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        // Highest-conviction buys first.
        buys.sort_by(|a, b| {
            b.target_weight
                .partial_cmp(&a.target_weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let sell_proceeds: f64 = sells.iter().map(|t| t.trade_value).sum();
        let buy_cost: f64 = buys.iter().map(|t| t.trade_value).sum();
        let available_cash = self.cash + sell_proceeds;

        if buy_cost > available_cash {
            log::warn!(
                "insufficient cash: need {buy_cost:.2}, have {available_cash:.2}"
            );
            buys = self.reduce_buys_to_cash(buys, available_cash);
        }

        log::info!(
            "generated {} sells ({sell_proceeds:.2}) and {} buys ({:.2})",
            sells.len(),
            buys.len(),
            buys.iter().map(|t| t.trade_value).sum::<f64>()
        );

        sells.extend(buys);
        sells
    }

    /// Reduce the buy list to fit available cash.
    ///
    /// Buys are consumed in conviction order. The first buy that no longer
    /// fits is cut down to whatever the remaining cash affords (if that
    /// still clears the minimums); later buys then see the drained pool.
    /// The highest-conviction name is protected, even partially, over
    /// lower-ranked ones.
    fn reduce_buys_to_cash(&self, buys: Vec<SizedTrade>, available_cash: f64) -> Vec<SizedTrade> {
        let mut result = Vec::new();
        let mut remaining_cash = available_cash;

        for trade in buys {
            if trade.trade_value <= remaining_cash {
                remaining_cash -= trade.trade_value;
                result.push(trade);
                continue;
            }

            let affordable_shares = (remaining_cash / trade.price).floor() as i64;
            let affordable_value = affordable_shares as f64 * trade.price;
            if affordable_shares >= self.cfg.min_trade_shares
                && affordable_value >= self.cfg.min_trade_value
            {
                log::info!(
                    "{}: reduced from {} to {affordable_shares} shares due to cash",
                    trade.symbol,
                    trade.shares
                );
                remaining_cash -= affordable_value;
                result.push(SizedTrade {
                    shares: affordable_shares,
                    trade_value: affordable_value,
                    reason: format!("{} (reduced due to cash)", trade.reason),
                    ..trade
                });
            } else {
                log::warn!("{}: skipped, insufficient cash", trade.symbol);
            }
        }

        result
    }
}
