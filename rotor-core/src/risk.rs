//! Risk limits and the kill switch.
//!
//! Two independent responsibilities: a persistent kill switch that blocks
//! the whole pipeline, and pre-trade validation of a sized batch against
//! position and turnover limits. The switch is re-checked inside
//! `validate_batch` even though the engine checks it at entry — redundant by
//! design.

use crate::domain::{SizedTrade, TradeAction};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The one error allowed to escape the pipeline.
#[derive(Debug, Clone, Error)]
#[error("kill switch active: {reason}")]
pub struct KillSwitchActive {
    pub reason: String,
}

/// Persistent out-of-band flag that unconditionally blocks execution.
///
/// No in-memory caching: every call re-reads the backing store, so an
/// operator flipping the switch mid-process takes effect on the next check.
pub trait KillSwitchStore: Send + Sync {
    fn is_active(&self) -> bool;

    /// Free-text reason recorded at activation, if active.
    fn reason(&self) -> Option<String>;

    fn activate(&self, reason: &str) -> std::io::Result<()>;

    /// Returns true if the switch was active and is now cleared.
    fn deactivate(&self) -> std::io::Result<bool>;
}

/// File-backed kill switch: marker file presence = active.
pub struct FileKillSwitch {
    path: PathBuf,
}

impl FileKillSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KillSwitchStore for FileKillSwitch {
    fn is_active(&self) -> bool {
        self.path.exists()
    }

    fn reason(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(_) => Some("Unknown reason".to_string()),
        }
    }

    fn activate(&self, reason: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = format!("{reason}\nActivated: {}", Utc::now().to_rfc3339());
        std::fs::write(&self.path, content)?;
        log::warn!("KILL SWITCH ACTIVATED: {reason}");
        Ok(())
    }

    fn deactivate(&self) -> std::io::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        log::info!("kill switch deactivated");
        Ok(true)
    }
}

/// Risk limit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Per-instrument cap as a fraction of equity.
    pub max_position_pct: f64,
    /// Portfolio-level brake on batch turnover.
    pub max_turnover_pct: f64,
    /// Rank beyond which a holding counts as "fell out of favor".
    pub exit_rank_threshold: usize,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_pct: 0.25,
            max_turnover_pct: 0.50,
            exit_rank_threshold: 5,
        }
    }
}

/// Result of validating one trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeCheck {
    pub valid: bool,
    pub symbol: String,
    pub reason: String,
    pub trade_value: f64,
    /// Trade notional as a fraction of equity, recorded for audit.
    pub trade_pct: f64,
}

/// Result of validating a whole batch. All-or-nothing: one failing trade
/// marks the batch invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValidation {
    pub valid: bool,
    pub checks: Vec<TradeCheck>,
    pub total_turnover_pct: f64,
    pub rejected_count: usize,
    pub reason: String,
}

/// Current limits and switch state, for status displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskStatus {
    pub max_position_pct: f64,
    pub max_turnover_pct: f64,
    pub exit_rank_threshold: usize,
    pub kill_switch_active: bool,
    pub kill_switch_reason: Option<String>,
}

/// Pre-trade risk validation and kill switch management.
///
/// The kill-switch store is injected — any backend satisfying the trait
/// works, and nothing here holds cached switch state.
pub struct RiskManager {
    limits: RiskLimits,
    kill_switch: Box<dyn KillSwitchStore>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, kill_switch: Box<dyn KillSwitchStore>) -> Self {
        log::debug!(
            "risk manager: max_position={:.0}%, max_turnover={:.0}%, exit_threshold=rank>{}",
            limits.max_position_pct * 100.0,
            limits.max_turnover_pct * 100.0,
            limits.exit_rank_threshold
        );
        Self {
            limits,
            kill_switch,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Error out if the kill switch is active. Called at pipeline entry,
    /// before any data is fetched.
    pub fn check_kill_switch(&self) -> Result<(), KillSwitchActive> {
        if self.kill_switch.is_active() {
            let reason = self
                .kill_switch
                .reason()
                .unwrap_or_else(|| "Unknown reason".to_string());
            return Err(KillSwitchActive { reason });
        }
        Ok(())
    }

    /// Validate a single trade against the limits.
    pub fn validate_trade(
        &self,
        trade: &SizedTrade,
        total_equity: f64,
        current_position_value: f64,
    ) -> TradeCheck {
        let trade_value = trade.shares as f64 * trade.price;
        let trade_pct = if total_equity > 0.0 {
            trade_value / total_equity
        } else {
            0.0
        };

        // Buys may not push the position past the cap.
        if trade.action == TradeAction::Buy {
            let resulting_position = current_position_value + trade_value;
            let resulting_weight = if total_equity > 0.0 {
                resulting_position / total_equity
            } else {
                0.0
            };
            if resulting_weight > self.limits.max_position_pct {
                return TradeCheck {
                    valid: false,
                    symbol: trade.symbol.clone(),
                    reason: format!(
                        "Position would exceed {:.0}% limit ({:.1}%)",
                        self.limits.max_position_pct * 100.0,
                        resulting_weight * 100.0
                    ),
                    trade_value,
                    trade_pct,
                };
            }
        }

        if trade.price <= 0.0 {
            return TradeCheck {
                valid: false,
                symbol: trade.symbol.clone(),
                reason: format!("Invalid price: {}", trade.price),
                trade_value,
                trade_pct,
            };
        }

        if trade.shares <= 0 {
            return TradeCheck {
                valid: false,
                symbol: trade.symbol.clone(),
                reason: format!("Invalid share count: {}", trade.shares),
                trade_value,
                trade_pct,
            };
        }

        TradeCheck {
            valid: true,
            symbol: trade.symbol.clone(),
            reason: "Passed all checks".into(),
            trade_value,
            trade_pct,
        }
    }

    /// Validate an entire batch.
    ///
    /// Re-checks the kill switch first, independently of the entry check.
    /// Then the turnover brake, then every trade individually. Exactly at
    /// the turnover limit passes; strictly above fails.
    pub fn validate_batch(
        &self,
        trades: &[SizedTrade],
        total_equity: f64,
        current_positions: &HashMap<String, f64>,
    ) -> BatchValidation {
        if self.kill_switch.is_active() {
            let reason = self
                .kill_switch
                .reason()
                .unwrap_or_else(|| "Unknown reason".to_string());
            return BatchValidation {
                valid: false,
                checks: Vec::new(),
                total_turnover_pct: 0.0,
                rejected_count: trades.len(),
                reason: format!("Kill switch active: {reason}"),
            };
        }

        let mut checks = Vec::with_capacity(trades.len());
        let mut total_turnover = 0.0;
        let mut rejected_count = 0;

        for trade in trades {
            let current_value = current_positions
                .get(&trade.symbol)
                .copied()
                .unwrap_or(0.0);
            let check = self.validate_trade(trade, total_equity, current_value);
            if !check.valid {
                rejected_count += 1;
            }
            total_turnover += trade.shares as f64 * trade.price;
            checks.push(check);
        }

        let turnover_pct = if total_equity > 0.0 {
            total_turnover / total_equity
        } else {
            0.0
        };

        if turnover_pct > self.limits.max_turnover_pct {
            return BatchValidation {
                valid: false,
                checks,
                total_turnover_pct: turnover_pct,
                rejected_count: trades.len(),
                reason: format!(
                    "Total turnover {:.1}% exceeds {:.0}% limit",
                    turnover_pct * 100.0,
                    self.limits.max_turnover_pct * 100.0
                ),
            };
        }

        if rejected_count > 0 {
            let failed: Vec<&str> = checks
                .iter()
                .filter(|c| !c.valid)
                .map(|c| c.symbol.as_str())
                .collect();
            let reason = format!(
                "{rejected_count} trades failed validation: {}",
                failed.join(", ")
            );
            return BatchValidation {
                valid: false,
                checks,
                total_turnover_pct: turnover_pct,
                rejected_count,
                reason,
            };
        }

        BatchValidation {
            valid: true,
            checks,
            total_turnover_pct: turnover_pct,
            rejected_count: 0,
            reason: "All trades passed validation".into(),
        }
    }

    /// Whether a holding's rank has dropped far enough to call it an exit.
    ///
    /// Pure predicate used by the reasoning output, independent of the
    /// weight-diff math that actually sizes the sell.
    pub fn should_exit_position(&self, rank: usize) -> bool {
        rank > self.limits.exit_rank_threshold
    }

    /// Snapshot of limits and switch state.
    pub fn status(&self) -> RiskStatus {
        RiskStatus {
            max_position_pct: self.limits.max_position_pct,
            max_turnover_pct: self.limits.max_turnover_pct,
            exit_rank_threshold: self.limits.exit_rank_threshold,
            kill_switch_active: self.kill_switch.is_active(),
            kill_switch_reason: self.kill_switch.reason(),
        }
    }
}
