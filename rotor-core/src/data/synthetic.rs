//! Synthetic price provider — seeded random walks for tests and offline runs.
//!
//! Each symbol gets an independent geometric random walk whose drift is
//! derived from the symbol name, so different sectors produce different
//! momentum. Deterministic for a given seed.

use super::provider::{PriceError, PricePoint, PriceProvider, PriceSeries};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic random-walk price provider.
pub struct SyntheticProvider {
    seed: u64,
    daily_vol: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            daily_vol: 0.01,
        }
    }

    /// Per-symbol RNG: base seed mixed with the symbol bytes.
    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut mixed = self.seed;
        for b in symbol.bytes() {
            mixed = mixed.wrapping_mul(31).wrapping_add(b as u64);
        }
        StdRng::seed_from_u64(mixed)
    }

    /// Annualized drift in [-20%, +20%] derived from the symbol.
    fn drift_for(symbol: &str) -> f64 {
        let h: u64 = symbol
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(131).wrapping_add(b as u64));
        ((h % 41) as f64 - 20.0) / 100.0
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        if end < start {
            return Err(PriceError::Other(format!(
                "invalid range: {start} > {end}"
            )));
        }

        let mut rng = self.rng_for(symbol);
        let daily_drift = Self::drift_for(symbol) / 252.0;
        let mut price = 100.0 + (rng.gen::<f64>() * 200.0);
        let mut points = Vec::new();
        let mut date = start;

        while date <= end {
            // Trading days only — weekend gaps mirror real series.
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let shock: f64 = rng.gen_range(-1.0..1.0) * self.daily_vol;
                price *= 1.0 + daily_drift + shock;
                points.push(PricePoint { date, close: price });
            }
            date += Duration::days(1);
        }

        Ok(PriceSeries {
            symbol: symbol.to_string(),
            points,
        })
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, PriceError> {
        let end = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let series = self.history(symbol, end - Duration::days(14), end)?;
        series
            .last_close()
            .ok_or_else(|| PriceError::QuoteUnavailable {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        )
    }

    #[test]
    fn deterministic_for_same_seed() {
        let (start, end) = range();
        let a = SyntheticProvider::new(42).history("SXLK.L", start, end).unwrap();
        let b = SyntheticProvider::new(42).history("SXLK.L", start, end).unwrap();
        assert_eq!(a.points.len(), b.points.len());
        for (pa, pb) in a.points.iter().zip(&b.points) {
            assert_eq!(pa.date, pb.date);
            assert_eq!(pa.close, pb.close);
        }
    }

    #[test]
    fn symbols_diverge() {
        let (start, end) = range();
        let provider = SyntheticProvider::new(42);
        let a = provider.history("SXLK.L", start, end).unwrap();
        let b = provider.history("SXLU.L", start, end).unwrap();
        assert_ne!(a.points[10].close, b.points[10].close);
    }

    #[test]
    fn skips_weekends() {
        let (start, end) = range();
        let series = SyntheticProvider::new(1).history("SXLE.L", start, end).unwrap();
        assert!(series
            .points
            .iter()
            .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn prices_stay_positive() {
        let (start, end) = range();
        let series = SyntheticProvider::new(7).history("SXLB.L", start, end).unwrap();
        assert!(series.points.iter().all(|p| p.close > 0.0));
    }

    #[test]
    fn inverted_range_rejected() {
        let provider = SyntheticProvider::new(1);
        let err = provider
            .history(
                "SXLK.L",
                NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, PriceError::Other(_)));
    }
}
