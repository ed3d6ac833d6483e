//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over quote sources (Yahoo chart API,
//! synthetic series) so the signal math can be tested without a network and
//! the source can be swapped without touching the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single daily close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily close series for one symbol, ascending by date.
///
/// Gaps (holidays, missing quotes) are simply absent — there is no
/// forward-fill. Owned transiently by the signal math; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Most recent close, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Whether the series holds any usable (positive, finite) closes.
    pub fn has_usable_data(&self) -> bool {
        self.points.iter().any(|p| p.close.is_finite() && p.close > 0.0)
    }
}

/// Structured error types for price data operations.
///
/// Unavailability is always an error — a provider must never report a
/// missing quote as a zero price.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no quote available for {symbol}")]
    QuoteUnavailable { symbol: String },

    #[error("price data error: {0}")]
    Other(String),
}

/// Trait for price data sources.
///
/// Implementations handle the specifics of one source; the signal math and
/// the engine only see this seam.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily close series for each symbol over a date range.
    ///
    /// A symbol the source cannot resolve is reported via `Err`, not as an
    /// empty series with zero prices.
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError>;

    /// Latest available close for a symbol.
    fn latest_price(&self, symbol: &str) -> Result<f64, PriceError>;
}
