//! Rotor Engine — orchestration of the signal-to-execution pipeline.
//!
//! This crate wires the decision math from `rotor-core` into a runnable
//! pipeline: TOML configuration, portfolio snapshot store, append-only JSONL
//! audit journal, order submission seam with a dry-run implementation, the
//! `ExecutionEngine` state machine, human-readable reasoning and reports,
//! the rebalance preview, and CSV export of the audit trail.

pub mod config;
pub mod engine;
pub mod export;
pub mod journal;
pub mod orders;
pub mod reasoning;
pub mod rebalance;
pub mod report;
pub mod snapshots;

pub use config::{AppConfig, ConfigError, ExecutionMode};
pub use engine::{ExecutionEngine, ExecutionReport, PipelineError};
pub use journal::{JournalEntry, SignalJournal};
pub use orders::{DryRunSubmitter, ExecutionOutcome, OrderStatus, OrderSubmitter};
pub use snapshots::SnapshotStore;
