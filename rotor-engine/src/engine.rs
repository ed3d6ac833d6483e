//! Execution engine — the signal-to-order pipeline state machine.
//!
//! Stage order: kill-switch check → signal → snapshot load (with staleness
//! gate) → price fetch → sizing → validation → submission → journal. Only a
//! kill-switch abort escapes as an error, and it escapes before anything is
//! journaled — the switch itself is the record of why nothing happened.
//! Every other failure is normalized into a failed `ExecutionReport` so a
//! scheduled caller never crashes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use rotor_core::data::PriceProvider;
use rotor_core::domain::{PortfolioSnapshot, Position, SectorRanking, SizedTrade};
use rotor_core::momentum::{generate_signal, SignalError};
use rotor_core::risk::{BatchValidation, FileKillSwitch, KillSwitchActive, RiskManager};
use rotor_core::sizing::PositionSizer;
use rotor_core::universe::Universe;

use crate::config::{AppConfig, ExecutionMode};
use crate::journal::{JournalEntry, JournalError, SignalJournal};
use crate::orders::{ExecutionOutcome, OrderSubmitter, SubmitError};
use crate::reasoning::format_signal_reasoning;
use crate::snapshots::{SnapshotError, SnapshotStore};

/// Snapshots older than this abort the run; stale data is worse than no
/// data when sizing real trades.
pub const STALE_ABORT_HOURS: f64 = 48.0;
/// Snapshots older than this proceed with a warning.
pub const STALE_WARN_HOURS: f64 = 24.0;

/// Failures normalized into a failed report (never propagated).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("signal generation failed: {0}")]
    Signal(#[from] SignalError),

    #[error("{0}")]
    Snapshot(#[from] SnapshotError),

    #[error("no portfolio snapshot found — run `rotor snapshot` first")]
    NoSnapshot,

    #[error(
        "snapshot is {age_hours:.0} hours old; maximum allowed age is \
         48 hours — refresh the snapshot"
    )]
    StaleSnapshot { age_hours: f64 },

    #[error(transparent)]
    Connection(#[from] SubmitError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Complete report of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub timestamp: DateTime<Utc>,
    pub execution_mode: ExecutionMode,
    pub signal_date: NaiveDate,
    pub rankings: Vec<SectorRanking>,
    pub top_sectors: Vec<String>,
    pub target_weights: HashMap<String, f64>,
    pub current_weights: HashMap<String, f64>,
    pub trades: Vec<SizedTrade>,
    pub validation: Option<BatchValidation>,
    pub execution_results: Vec<ExecutionOutcome>,
    pub total_equity: f64,
    pub cash: f64,
    pub reasoning: String,
    pub success: bool,
    pub error_message: String,
}

impl ExecutionReport {
    fn failed(timestamp: DateTime<Utc>, mode: ExecutionMode, error_message: String) -> Self {
        Self {
            timestamp,
            execution_mode: mode,
            signal_date: timestamp.date_naive(),
            rankings: Vec::new(),
            top_sectors: Vec::new(),
            target_weights: HashMap::new(),
            current_weights: HashMap::new(),
            trades: Vec::new(),
            validation: None,
            execution_results: Vec::new(),
            total_equity: 0.0,
            cash: 0.0,
            reasoning: String::new(),
            success: false,
            error_message,
        }
    }
}

/// Orchestrates the signal-to-execution pipeline.
///
/// Every collaborator is injected — price provider, order submitter, and
/// (via the config paths) the kill-switch store, snapshot directory, and
/// journal file. No ambient global state.
pub struct ExecutionEngine {
    config: AppConfig,
    universe: Universe,
    provider: Box<dyn PriceProvider>,
    submitter: Box<dyn OrderSubmitter>,
    risk: RiskManager,
    journal: SignalJournal,
    snapshots: SnapshotStore,
}

impl ExecutionEngine {
    pub fn new(
        config: AppConfig,
        universe: Universe,
        provider: Box<dyn PriceProvider>,
        submitter: Box<dyn OrderSubmitter>,
    ) -> Self {
        let kill_switch = FileKillSwitch::new(config.paths.kill_switch.clone());
        let risk = RiskManager::new(config.risk_limits(), Box::new(kill_switch));
        let journal = SignalJournal::new(config.paths.journal.clone());
        let snapshots = SnapshotStore::new(config.paths.snapshots.clone());

        log::info!(
            "execution engine initialized in {} mode",
            config.execution.mode.as_str()
        );

        Self {
            config,
            universe,
            provider,
            submitter,
            risk,
            journal,
            snapshots,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.config.execution.mode
    }

    pub fn journal(&self) -> &SignalJournal {
        &self.journal
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    /// Run the full pipeline at the current wall-clock time.
    pub fn run(&mut self) -> Result<ExecutionReport, KillSwitchActive> {
        self.run_at(Utc::now())
    }

    /// Run the full pipeline at an explicit timestamp.
    ///
    /// Returns `Err` only for a kill-switch abort, and in that case nothing
    /// has been journaled. All other failures come back as a report with
    /// `success == false`, journaled for audit.
    pub fn run_at(&mut self, now: DateTime<Utc>) -> Result<ExecutionReport, KillSwitchActive> {
        log::info!("starting execution pipeline at {now}");

        // Before anything else — an active switch must not even cost us a
        // data fetch.
        self.risk.check_kill_switch()?;

        match self.run_inner(now) {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("execution pipeline failed: {e}");
                let report =
                    ExecutionReport::failed(now, self.config.execution.mode, e.to_string());
                self.journal_failure(&report);
                Ok(report)
            }
        }
    }

    fn run_inner(&mut self, now: DateTime<Utc>) -> Result<ExecutionReport, PipelineError> {
        let mode = self.config.execution.mode;

        // Step 1: momentum signal.
        log::info!("step 1: generating momentum signal");
        let signal = generate_signal(
            self.provider.as_ref(),
            &self.universe.symbols(),
            now.date_naive(),
            &self.config.momentum_config(),
        )?;
        let target_weights = signal.target_weights();

        // Step 2: portfolio snapshot, gated on staleness.
        log::info!("step 2: loading portfolio snapshot");
        let snapshot = self
            .snapshots
            .load_latest()?
            .ok_or(PipelineError::NoSnapshot)?;

        let age_hours = snapshot.age_hours(now);
        if age_hours > STALE_ABORT_HOURS {
            return Err(PipelineError::StaleSnapshot { age_hours });
        }
        if age_hours > STALE_WARN_HOURS {
            log::warn!("snapshot is {age_hours:.0} hours old — consider refreshing");
        }

        let total_equity = snapshot.total_equity;
        let cash = snapshot.cash;
        let positions = self.normalized_positions(&snapshot);
        let current_weights: HashMap<String, f64> = if total_equity > 0.0 {
            positions
                .iter()
                .map(|(symbol, p)| (symbol.clone(), p.market_value / total_equity))
                .collect()
        } else {
            HashMap::new()
        };

        log::info!(
            "portfolio: equity={total_equity:.2}, cash={cash:.2}, positions={}",
            positions.len()
        );

        // Step 3: live prices for targets and holdings.
        log::info!("step 3: fetching current prices");
        let prices = self.fetch_prices(&target_weights, &positions);

        // Step 4: sizing.
        log::info!("step 4: calculating trades");
        let sizer = PositionSizer::new(
            total_equity,
            cash,
            positions.clone(),
            self.config.sizer_config(),
        );
        let trades = sizer.generate_trades(&target_weights, &prices);

        // Step 5: risk validation.
        log::info!("step 5: validating {} trades", trades.len());
        let position_values: HashMap<String, f64> = positions
            .iter()
            .map(|(symbol, p)| (symbol.clone(), p.market_value))
            .collect();
        let validation = self.risk.validate_batch(&trades, total_equity, &position_values);

        let holdings: Vec<String> = positions.keys().cloned().collect();
        let reasoning = format_signal_reasoning(
            &signal.rankings,
            &holdings,
            &trades,
            self.risk.limits().exit_rank_threshold,
        );

        if !validation.valid {
            // Journal what was attempted and why it was blocked, but submit
            // nothing.
            log::warn!("trade validation failed: {}", validation.reason);
            let error_message = format!("Validation failed: {}", validation.reason);
            self.journal.append(&JournalEntry {
                timestamp: now,
                signal_date: signal.signal_date,
                execution_mode: mode,
                rankings: signal.rankings.clone(),
                top_sectors: signal.top_sectors.clone(),
                target_weights: target_weights.clone(),
                trades: trades.clone(),
                trade_count: trades.len(),
                validation: Some(validation.clone()),
                execution_results: Vec::new(),
                reasoning: reasoning.clone(),
            })?;

            return Ok(ExecutionReport {
                timestamp: now,
                execution_mode: mode,
                signal_date: signal.signal_date,
                rankings: signal.rankings,
                top_sectors: signal.top_sectors,
                target_weights,
                current_weights,
                trades,
                validation: Some(validation),
                execution_results: Vec::new(),
                total_equity,
                cash,
                reasoning,
                success: false,
                error_message,
            });
        }

        // Step 6: submission (sells first; no-op in dry run).
        let execution_results = if trades.is_empty() {
            log::info!("no trades to execute");
            Vec::new()
        } else {
            log::info!("step 6: executing {} trades", trades.len());
            self.submitter.connect()?;
            let results = self.submitter.submit_batch(&trades);
            // Always disconnect, whatever the per-order outcomes were.
            self.submitter.disconnect();
            results
        };

        // Step 7: journal the complete bundle.
        log::info!("step 7: journaling signal");
        self.journal.append(&JournalEntry {
            timestamp: now,
            signal_date: signal.signal_date,
            execution_mode: mode,
            rankings: signal.rankings.clone(),
            top_sectors: signal.top_sectors.clone(),
            target_weights: target_weights.clone(),
            trades: trades.clone(),
            trade_count: trades.len(),
            validation: Some(validation.clone()),
            execution_results: execution_results.clone(),
            reasoning: reasoning.clone(),
        })?;

        log::info!(
            "execution complete [{}]: {} trades",
            mode.as_str(),
            trades.len()
        );

        Ok(ExecutionReport {
            timestamp: now,
            execution_mode: mode,
            signal_date: signal.signal_date,
            rankings: signal.rankings,
            top_sectors: signal.top_sectors,
            target_weights,
            current_weights,
            trades,
            validation: Some(validation),
            execution_results,
            total_equity,
            cash,
            reasoning,
            success: true,
            error_message: String::new(),
        })
    }

    /// Snapshot positions keyed by feed symbol (broker symbols gain the
    /// exchange suffix so they line up with the signal).
    fn normalized_positions(&self, snapshot: &PortfolioSnapshot) -> HashMap<String, Position> {
        snapshot
            .positions
            .iter()
            .map(|p| (self.universe.normalize_symbol(&p.symbol), p.clone()))
            .collect()
    }

    /// Latest prices for the union of target and held symbols. A symbol
    /// whose quote fails is skipped with a warning — the sizer falls back
    /// to the snapshot mark.
    fn fetch_prices(
        &self,
        target_weights: &HashMap<String, f64>,
        positions: &HashMap<String, Position>,
    ) -> HashMap<String, f64> {
        let mut symbols: Vec<&String> = target_weights.keys().chain(positions.keys()).collect();
        symbols.sort();
        symbols.dedup();

        let mut prices = HashMap::new();
        for symbol in symbols {
            match self.provider.latest_price(symbol) {
                Ok(price) if price > 0.0 => {
                    prices.insert(symbol.clone(), price);
                }
                Ok(price) => {
                    log::warn!("{symbol}: non-positive quote {price}, ignoring");
                }
                Err(e) => {
                    log::warn!("{symbol}: failed to get price: {e}");
                }
            }
        }
        prices
    }

    /// Best-effort journaling of a failed run; a journal failure here is
    /// logged, never propagated.
    fn journal_failure(&self, report: &ExecutionReport) {
        let entry = JournalEntry {
            timestamp: report.timestamp,
            signal_date: report.signal_date,
            execution_mode: report.execution_mode,
            rankings: Vec::new(),
            top_sectors: Vec::new(),
            target_weights: HashMap::new(),
            trades: Vec::new(),
            trade_count: 0,
            validation: None,
            execution_results: Vec::new(),
            reasoning: format!("Pipeline failed: {}", report.error_message),
        };
        if let Err(e) = self.journal.append(&entry) {
            log::error!("failed to journal pipeline failure: {e}");
        }
    }
}
