//! Order submission seam and the dry-run implementation.
//!
//! The pipeline only needs "submit a batch of sized trades, sells first,
//! and tell me what happened to each". Live broker connectivity plugs in
//! behind `OrderSubmitter`; the shipped implementation is the dry run,
//! which performs every step except sending orders anywhere.

use chrono::{DateTime, Utc};
use rotor_core::domain::SizedTrade;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to connect to order venue: {0}")]
    Connection(String),
}

/// Terminal state of one submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Filled,
    Rejected,
    DryRun,
}

/// Outcome of one order submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub order_id: String,
    pub symbol: String,
    pub action: String,
    pub shares: i64,
    pub status: OrderStatus,
    pub fill_price: Option<f64>,
    pub fill_time: Option<DateTime<Utc>>,
    pub message: String,
}

/// Order venue seam.
///
/// `submit_batch` partitions sells before buys itself: even a caller that
/// hands over an unordered batch realizes cash before spending it.
pub trait OrderSubmitter: Send {
    fn connect(&mut self) -> Result<(), SubmitError>;

    fn submit_batch(&mut self, trades: &[SizedTrade]) -> Vec<ExecutionOutcome>;

    fn disconnect(&mut self);
}

/// Dry-run submitter: every order "fills" at its proposal price with status
/// `dry_run`. Order IDs are derived from a per-batch content hash so reruns
/// of the same batch are traceable in the journal.
pub struct DryRunSubmitter;

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self
    }

    fn batch_id(trades: &[SizedTrade]) -> String {
        let payload = serde_json::to_vec(trades).unwrap_or_default();
        let hash = blake3::hash(&payload);
        hash.to_hex()[..8].to_string()
    }
}

impl Default for DryRunSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderSubmitter for DryRunSubmitter {
    fn connect(&mut self) -> Result<(), SubmitError> {
        log::info!("dry-run mode: skipping venue connection");
        Ok(())
    }

    fn submit_batch(&mut self, trades: &[SizedTrade]) -> Vec<ExecutionOutcome> {
        let batch_id = Self::batch_id(trades);
        let now = Utc::now();

        let sells = trades.iter().filter(|t| t.is_sell());
        let buys = trades.iter().filter(|t| t.is_buy());

        sells
            .chain(buys)
            .enumerate()
            .map(|(seq, trade)| {
                log::info!(
                    "[DRY RUN] would submit: {} {} {} @ ~{:.2}",
                    trade.action,
                    trade.shares,
                    trade.symbol,
                    trade.price
                );
                ExecutionOutcome {
                    order_id: format!("{batch_id}-{seq}"),
                    symbol: trade.symbol.clone(),
                    action: trade.action.to_string(),
                    shares: trade.shares,
                    status: OrderStatus::DryRun,
                    fill_price: Some(trade.price),
                    fill_time: Some(now),
                    message: "Dry run - order not submitted".into(),
                }
            })
            .collect()
    }

    fn disconnect(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotor_core::domain::TradeAction;

    fn trade(symbol: &str, action: TradeAction, shares: i64) -> SizedTrade {
        SizedTrade {
            symbol: symbol.into(),
            action,
            shares,
            price: 100.0,
            target_weight: 0.25,
            current_weight: 0.0,
            trade_value: shares as f64 * 100.0,
            reason: String::new(),
        }
    }

    #[test]
    fn dry_run_marks_every_order() {
        let mut submitter = DryRunSubmitter::new();
        submitter.connect().unwrap();
        let outcomes = submitter.submit_batch(&[
            trade("SXLK.L", TradeAction::Buy, 10),
            trade("SXLE.L", TradeAction::Sell, 5),
        ]);
        submitter.disconnect();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == OrderStatus::DryRun));
        assert!(outcomes.iter().all(|o| o.fill_price == Some(100.0)));
    }

    #[test]
    fn sells_submitted_before_buys_regardless_of_input_order() {
        let mut submitter = DryRunSubmitter::new();
        let outcomes = submitter.submit_batch(&[
            trade("SXLK.L", TradeAction::Buy, 10),
            trade("SXLE.L", TradeAction::Sell, 5),
            trade("SXLU.L", TradeAction::Sell, 3),
        ]);

        assert_eq!(outcomes[0].action, "SELL");
        assert_eq!(outcomes[1].action, "SELL");
        assert_eq!(outcomes[2].action, "BUY");
    }

    #[test]
    fn order_ids_unique_within_batch_and_stable_across_batches() {
        let mut submitter = DryRunSubmitter::new();
        let batch = vec![
            trade("SXLK.L", TradeAction::Buy, 10),
            trade("SXLE.L", TradeAction::Sell, 5),
        ];
        let a = submitter.submit_batch(&batch);
        let b = submitter.submit_batch(&batch);

        assert_ne!(a[0].order_id, a[1].order_id);
        // Same content, same batch hash.
        assert_eq!(a[0].order_id, b[0].order_id);
    }

    #[test]
    fn empty_batch_yields_no_outcomes() {
        let mut submitter = DryRunSubmitter::new();
        assert!(submitter.submit_batch(&[]).is_empty());
    }
}
