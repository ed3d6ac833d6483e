//! Sized trades — the one trade record used end-to-end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A concrete trade produced by the position sizer.
///
/// `shares` is always positive; direction lives in `action`. This record is
/// immutable once produced and flows unchanged through validation,
/// submission, and the audit journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedTrade {
    pub symbol: String,
    pub action: TradeAction,
    pub shares: i64,
    pub price: f64,
    pub target_weight: f64,
    pub current_weight: f64,
    pub trade_value: f64,
    pub reason: String,
}

impl SizedTrade {
    pub fn is_buy(&self) -> bool {
        self.action == TradeAction::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == TradeAction::Sell
    }
}
