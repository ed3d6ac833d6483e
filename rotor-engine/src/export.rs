//! CSV export of the audit trail — a flat trade blotter.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::journal::{JournalError, SignalJournal};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One blotter row: a trade from one journaled run.
#[derive(Debug, Serialize)]
struct BlotterRow<'a> {
    timestamp: String,
    signal_date: String,
    execution_mode: &'a str,
    symbol: &'a str,
    action: String,
    shares: i64,
    price: f64,
    trade_value: f64,
    validation: &'a str,
    reason: &'a str,
}

/// Flatten every journaled trade into a CSV blotter.
///
/// Returns the number of rows written. Runs with no trades contribute no
/// rows — they are visible in the journal itself, not the blotter.
pub fn export_trade_blotter(journal: &SignalJournal, output: &Path) -> Result<usize, ExportError> {
    let entries = journal.read_all()?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)?;
    let mut rows = 0;

    for entry in &entries {
        let validation = match &entry.validation {
            Some(v) if v.valid => "passed",
            Some(_) => "failed",
            None => "none",
        };
        for trade in &entry.trades {
            writer.serialize(BlotterRow {
                timestamp: entry.timestamp.to_rfc3339(),
                signal_date: entry.signal_date.to_string(),
                execution_mode: entry.execution_mode.as_str(),
                symbol: &trade.symbol,
                action: trade.action.to_string(),
                shares: trade.shares,
                price: trade.price,
                trade_value: trade.trade_value,
                validation,
                reason: &trade.reason,
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    log::info!("exported {rows} blotter rows to {}", output.display());
    Ok(rows)
}
