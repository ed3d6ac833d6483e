//! 12-1 momentum signal over the sector universe.
//!
//! The signal ranks sectors by trailing 12-month compounded return excluding
//! the most recent month (skipping it avoids short-term reversal
//! contamination), then equal-weights the top names that clear a momentum
//! floor. Deterministic: identical price history and as-of date produce
//! identical rankings and weights.

use crate::data::{PriceError, PriceProvider, PriceSeries};
use crate::domain::{MomentumSignal, SectorRanking};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Momentum floor: sectors below this 12-1 return get no allocation even if
/// top-ranked. Prevents buying the least-bad losers in a broad downturn.
pub const MIN_MOMENTUM: f64 = -0.20;

/// Months of history requested from the provider.
pub const HISTORY_MONTHS: i64 = 13;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no usable price data for any symbol")]
    NoData,

    #[error("need at least 13 months of data, got {months}")]
    InsufficientHistory { months: usize },

    #[error(transparent)]
    Provider(#[from] PriceError),
}

/// Signal generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Number of top-ranked sectors eligible for allocation.
    pub top_n: usize,
    /// Momentum floor applied to the top-N.
    pub min_momentum: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            min_momentum: MIN_MOMENTUM,
        }
    }
}

/// Last close of each calendar month, ascending.
///
/// The trailing partial month is included as its own entry — the 12-1 window
/// excludes its return anyway.
pub fn monthly_closes(series: &PriceSeries) -> Vec<f64> {
    let mut closes: Vec<f64> = Vec::new();
    let mut current_month: Option<(i32, u32)> = None;

    for point in &series.points {
        if !point.close.is_finite() || point.close <= 0.0 {
            continue;
        }
        let month = (point.date.year(), point.date.month());
        if current_month == Some(month) {
            *closes.last_mut().expect("month open implies close") = point.close;
        } else {
            current_month = Some(month);
            closes.push(point.close);
        }
    }

    closes
}

/// Month-over-month simple returns from month-end closes.
pub fn monthly_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

/// 12-1 momentum: compound the 12 returns ending one month back.
///
/// With returns `r[0..n]`, the window is `r[n-13 .. n-1]` — the most recent
/// month's return is excluded.
pub fn momentum_12_1(returns: &[f64]) -> Result<f64, SignalError> {
    let n = returns.len();
    if n < 13 {
        return Err(SignalError::InsufficientHistory { months: n });
    }
    let compounded = returns[n - 13..n - 1]
        .iter()
        .fold(1.0, |acc, r| acc * (1.0 + r));
    Ok(compounded - 1.0)
}

/// Rank symbols descending by momentum. Rank 1 = best.
///
/// The sort is stable, so ties keep the input (universe declaration) order —
/// deterministic across runs.
pub fn rank_by_momentum(momentum: Vec<(String, f64)>) -> Vec<SectorRanking> {
    let mut entries = momentum;
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, momentum))| SectorRanking {
            symbol,
            momentum,
            rank: i + 1,
            target_weight: 0.0,
        })
        .collect()
}

/// Assign equal weights to the eligible subset of the top-N.
///
/// Eligible = rank <= top_n AND momentum >= floor. Each eligible sector gets
/// `1/|eligible|`; everything else stays at exactly zero. An empty eligible
/// set leaves all weights zero (100% cash) — that is a stance, not an error.
pub fn assign_target_weights(rankings: &mut [SectorRanking], cfg: &MomentumConfig) {
    let eligible: Vec<usize> = rankings
        .iter()
        .enumerate()
        .filter(|(_, r)| r.rank <= cfg.top_n && r.momentum >= cfg.min_momentum)
        .map(|(i, _)| i)
        .collect();

    if eligible.is_empty() {
        log::warn!(
            "no sectors meet minimum momentum threshold of {:.1}%",
            cfg.min_momentum * 100.0
        );
        return;
    }

    let weight = 1.0 / eligible.len() as f64;
    for i in eligible {
        rankings[i].target_weight = weight;
    }
}

/// Generate the complete momentum signal for an as-of date.
///
/// Symbols the provider cannot resolve are dropped with a warning; the
/// signal fails only when nothing usable remains or the surviving history
/// is shorter than 13 months.
pub fn generate_signal(
    provider: &dyn PriceProvider,
    symbols: &[String],
    as_of: NaiveDate,
    cfg: &MomentumConfig,
) -> Result<MomentumSignal, SignalError> {
    let start = as_of - Duration::days(HISTORY_MONTHS * 31 + 10);

    let mut momentum: Vec<(String, f64)> = Vec::with_capacity(symbols.len());
    let mut min_months = usize::MAX;
    let mut last_error: Option<PriceError> = None;

    for symbol in symbols {
        let series = match provider.history(symbol, start, as_of) {
            Ok(series) => series,
            Err(e) => {
                log::warn!("{symbol}: price history unavailable: {e}");
                last_error = Some(e);
                continue;
            }
        };
        if !series.has_usable_data() {
            log::warn!("{symbol}: no usable closes after cleaning, dropping");
            continue;
        }

        let returns = monthly_returns(&monthly_closes(&series));
        min_months = min_months.min(returns.len());
        if returns.len() < 13 {
            continue;
        }

        let value = momentum_12_1(&returns)?;
        if !value.is_finite() {
            log::warn!("{symbol}: non-finite momentum, dropping");
            continue;
        }
        momentum.push((symbol.clone(), value));
    }

    if momentum.is_empty() {
        return match last_error {
            // Every fetch failed — surface the provider's reason.
            Some(e) if min_months == usize::MAX => Err(SignalError::Provider(e)),
            _ if min_months == usize::MAX => Err(SignalError::NoData),
            _ => Err(SignalError::InsufficientHistory { months: min_months }),
        };
    }

    let mut rankings = rank_by_momentum(momentum);
    assign_target_weights(&mut rankings, cfg);

    let top_sectors: Vec<String> = rankings
        .iter()
        .filter(|r| r.target_weight > 0.0)
        .map(|r| r.symbol.clone())
        .collect();

    log::info!(
        "signal {as_of}: top {} of {} ranked sectors: {:?}",
        cfg.top_n,
        rankings.len(),
        top_sectors
    );

    Ok(MomentumSignal {
        signal_date: as_of,
        rankings,
        top_sectors,
        top_n: cfg.top_n,
    })
}
