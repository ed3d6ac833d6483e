//! Signal journal — append-only JSONL audit trail.
//!
//! One JSON object per line: resilient to partial writes, easy to stream,
//! and append-only by construction. Every pipeline run that gets past the
//! kill switch lands here — including failed ones — so the journal is the
//! complete record of what was attempted and why.

use chrono::{DateTime, NaiveDate, Utc};
use rotor_core::domain::{SectorRanking, SizedTrade};
use rotor_core::risk::BatchValidation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ExecutionMode;
use crate::orders::ExecutionOutcome;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize journal entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One audited pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub signal_date: NaiveDate,
    pub execution_mode: ExecutionMode,
    pub rankings: Vec<SectorRanking>,
    pub top_sectors: Vec<String>,
    pub target_weights: HashMap<String, f64>,
    pub trades: Vec<SizedTrade>,
    pub trade_count: usize,
    pub validation: Option<BatchValidation>,
    pub execution_results: Vec<ExecutionOutcome>,
    pub reasoning: String,
}

/// JSONL journal file manager.
pub struct SignalJournal {
    path: PathBuf,
}

impl SignalJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    pub fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;

        log::info!("signal journaled to {}", self.path.display());
        Ok(())
    }

    /// Read all entries in file (chronological) order.
    ///
    /// Malformed lines are skipped, not fatal.
    pub fn read_all(&self) -> Result<Vec<JournalEntry>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!("skipping malformed journal line: {e}");
                    continue;
                }
            }
        }

        Ok(entries)
    }

    /// The most recent `limit` entries, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<JournalEntry>, JournalError> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// The most recent entry, if any.
    pub fn latest(&self) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self.history(1)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(day: u32, reasoning: &str) -> JournalEntry {
        JournalEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 16, 35, 0).unwrap(),
            signal_date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            execution_mode: ExecutionMode::DryRun,
            rankings: vec![SectorRanking {
                symbol: "SXLK.L".into(),
                momentum: 0.12,
                rank: 1,
                target_weight: 1.0,
            }],
            top_sectors: vec!["SXLK.L".into()],
            target_weights: [("SXLK.L".to_string(), 1.0)].into(),
            trades: vec![],
            trade_count: 0,
            validation: None,
            execution_results: vec![],
            reasoning: reasoning.into(),
        }
    }

    #[test]
    fn append_and_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let journal = SignalJournal::new(dir.path().join("signals/journal.jsonl"));

        journal.append(&entry(1, "first")).unwrap();
        journal.append(&entry(2, "second")).unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reasoning, "first");
        assert_eq!(entries[1].reasoning, "second");
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let journal = SignalJournal::new(dir.path().join("journal.jsonl"));

        for day in 1..=5 {
            journal.append(&entry(day, &format!("run {day}"))).unwrap();
        }

        let recent = journal.history(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].reasoning, "run 5");
        assert_eq!(recent[2].reasoning, "run 3");
    }

    #[test]
    fn latest_of_empty_journal_is_none() {
        let dir = TempDir::new().unwrap();
        let journal = SignalJournal::new(dir.path().join("journal.jsonl"));
        assert!(journal.latest().unwrap().is_none());
    }

    #[test]
    fn malformed_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = SignalJournal::new(&path);

        journal.append(&entry(1, "good")).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{truncated").unwrap();
        }
        journal.append(&entry(2, "also good")).unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
    }
}
