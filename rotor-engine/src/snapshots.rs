//! Portfolio snapshot store — dated JSON files in a directory.
//!
//! Snapshots are produced externally (broker query) as `YYYY-MM-DD.json`;
//! the pipeline only ever reads the most recent one. Staleness is judged by
//! the timestamp inside the snapshot, not the filename.

use chrono::Utc;
use rotor_core::domain::{PortfolioSnapshot, SnapshotIntegrity};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse snapshot {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error(
        "snapshot integrity check failed: equity {total_equity:.2} well above \
         cash {cash:.2} but no positions loaded (~{missing_value:.2} missing)"
    )]
    Corrupt {
        total_equity: f64,
        cash: f64,
        missing_value: f64,
    },
}

/// Directory of dated snapshot JSON files.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the most recent snapshot, or `None` when the directory is empty
    /// or missing.
    ///
    /// A corrupt snapshot (the known empty-positions failure mode) is an
    /// error, not `None`: stale-but-honest data is recoverable upstream,
    /// silently trading on a half-loaded portfolio is not.
    pub fn load_latest(&self) -> Result<Option<PortfolioSnapshot>, SnapshotError> {
        if !self.dir.exists() {
            log::warn!("snapshots directory not found: {}", self.dir.display());
            return Ok(None);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();

        if files.is_empty() {
            log::warn!("no snapshot files found in {}", self.dir.display());
            return Ok(None);
        }

        // Dated filenames sort chronologically.
        files.sort();
        let latest = files.last().expect("non-empty file list");
        log::info!("loading snapshot from {}", latest.display());

        let content = std::fs::read_to_string(latest)?;
        let snapshot: PortfolioSnapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
                path: latest.display().to_string(),
                source,
            })?;

        if let SnapshotIntegrity::MissingPositions { missing_value } = snapshot.integrity() {
            return Err(SnapshotError::Corrupt {
                total_equity: snapshot.total_equity,
                cash: snapshot.cash,
                missing_value,
            });
        }

        Ok(Some(snapshot))
    }

    /// Save a snapshot under today's date (operator tooling; the pipeline
    /// itself never writes snapshots).
    pub fn save(&self, snapshot: &PortfolioSnapshot) -> Result<PathBuf, SnapshotError> {
        std::fs::create_dir_all(&self.dir)?;
        let date_str = Utc::now().format("%Y-%m-%d");
        let path = self.dir.join(format!("{date_str}.json"));
        let json = serde_json::to_string_pretty(snapshot).expect("snapshot serializes");
        std::fs::write(&path, json)?;
        log::info!("saved snapshot to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rotor_core::domain::Position;
    use tempfile::TempDir;

    fn snapshot(equity: f64, cash: f64, positions: Vec<Position>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 16, 30, 0).unwrap(),
            total_equity: equity,
            cash,
            positions,
        }
    }

    fn write_snapshot(dir: &Path, name: &str, snap: &PortfolioSnapshot) {
        std::fs::write(
            dir.join(name),
            serde_json::to_string_pretty(snap).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn missing_directory_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("nope"));
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn empty_directory_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn latest_dated_file_wins() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), "2025-05-01.json", &snapshot(90_000.0, 90_000.0, vec![]));
        write_snapshot(dir.path(), "2025-06-01.json", &snapshot(95_000.0, 95_000.0, vec![]));
        write_snapshot(dir.path(), "2025-04-01.json", &snapshot(80_000.0, 80_000.0, vec![]));

        let store = SnapshotStore::new(dir.path());
        let snap = store.load_latest().unwrap().unwrap();
        assert_eq!(snap.total_equity, 95_000.0);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), "2025-06-01.json", &snapshot(100_000.0, 5_000.0, vec![]));

        let store = SnapshotStore::new(dir.path());
        let err = store.load_latest().unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { .. }));
        assert!(err.to_string().contains("integrity"));
    }

    #[test]
    fn malformed_json_reports_the_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("2025-06-01.json"), "{not json").unwrap();

        let store = SnapshotStore::new(dir.path());
        let err = store.load_latest().unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
        assert!(err.to_string().contains("2025-06-01.json"));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snaps"));
        let snap = snapshot(
            50_000.0,
            20_000.0,
            vec![Position {
                symbol: "SXLK.L".into(),
                quantity: 100.0,
                avg_cost: 290.0,
                market_price: 300.0,
                market_value: 30_000.0,
                unrealized_pnl: 1_000.0,
            }],
        );

        store.save(&snap).unwrap();
        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded.positions.len(), 1);
        assert_eq!(loaded.positions[0].symbol, "SXLK.L");
    }
}
