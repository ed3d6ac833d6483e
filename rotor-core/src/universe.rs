//! Sector-ETF universe — immutable reference data.
//!
//! The universe is stored as a TOML file listing the tradable sector ETFs
//! and the exchange suffix used to reconcile broker symbols (IBKR reports
//! LSE positions without the `.L` suffix the data feed uses).

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A tradable sector ETF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorEtf {
    pub ticker: String,
    pub name: String,
}

/// The tradable universe: sector ETFs plus the exchange suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    /// Exchange suffix appended to bare broker symbols (e.g. ".L").
    #[serde(default)]
    pub suffix: Option<String>,
    pub etfs: Vec<SectorEtf>,
}

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("universe has no ETFs")]
    Empty,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let universe: Universe = toml::from_str(content)?;
        if universe.etfs.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(universe)
    }

    /// All tickers in declaration order.
    pub fn symbols(&self) -> Vec<String> {
        self.etfs.iter().map(|e| e.ticker.clone()).collect()
    }

    /// Sector name for a ticker, if it is in the universe.
    pub fn sector_name(&self, ticker: &str) -> Option<&str> {
        self.etfs
            .iter()
            .find(|e| e.ticker == ticker)
            .map(|e| e.name.as_str())
    }

    /// Append the exchange suffix to a bare broker symbol.
    pub fn normalize_symbol(&self, symbol: &str) -> String {
        match &self.suffix {
            Some(suffix) if !symbol.ends_with(suffix.as_str()) => {
                format!("{symbol}{suffix}")
            }
            _ => symbol.to_string(),
        }
    }

    /// Strip the exchange suffix for display.
    pub fn display_symbol<'a>(&self, symbol: &'a str) -> &'a str {
        match &self.suffix {
            Some(suffix) => symbol.strip_suffix(suffix.as_str()).unwrap_or(symbol),
            None => symbol,
        }
    }

    /// The default universe: nine LSE-listed SPDR US sector UCITS ETFs.
    pub fn default_uk_sectors() -> Self {
        let etfs = [
            ("SXLK.L", "Technology"),
            ("SXLF.L", "Financials"),
            ("SXLE.L", "Energy"),
            ("SXLV.L", "Health Care"),
            ("SXLY.L", "Cons Discr"),
            ("SXLP.L", "Cons Staples"),
            ("SXLI.L", "Industrials"),
            ("SXLB.L", "Materials"),
            ("SXLU.L", "Utilities"),
        ]
        .into_iter()
        .map(|(ticker, name)| SectorEtf {
            ticker: ticker.into(),
            name: name.into(),
        })
        .collect();

        Self {
            suffix: Some(".L".into()),
            etfs,
        }
    }
}
