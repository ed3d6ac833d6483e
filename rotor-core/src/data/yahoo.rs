//! Yahoo Finance price provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API with retry and exponential
//! backoff. Yahoo has no official API and is subject to unannounced format
//! changes; format drift surfaces as `PriceError::ResponseFormatChanged`.

use super::provider::{PriceError, PricePoint, PriceProvider, PriceSeries};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance price provider (blocking).
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// Parse the chart API response into daily close points.
    ///
    /// Prefers adjusted closes when present (dividends matter for 12-month
    /// momentum on equity ETFs).
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PricePoint>, PriceError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    PriceError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    PriceError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                PriceError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| PriceError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| PriceError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| PriceError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut points = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    PriceError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or_else(|| quote.close.get(i).copied().flatten());

            // Holidays and halted days come back as nulls — drop them.
            let Some(close) = close else { continue };
            if !close.is_finite() || close <= 0.0 {
                continue;
            }

            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(PriceError::QuoteUnavailable {
                symbol: symbol.to_string(),
            });
        }

        Ok(points)
    }

    /// Execute the HTTP request with retry and exponential backoff.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, PriceError> {
        let url = Self::chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(PriceError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        last_error = Some(PriceError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        PriceError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(symbol, chart);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(PriceError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(PriceError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceError::Other("max retries exceeded".into())))
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        let points = self.fetch_with_retry(symbol, start, end)?;
        log::debug!("{symbol}: {} daily closes from yahoo", points.len());
        Ok(PriceSeries {
            symbol: symbol.to_string(),
            points,
        })
    }

    /// Latest close via a short trailing window (covers weekends/holidays).
    fn latest_price(&self, symbol: &str) -> Result<f64, PriceError> {
        let end = Utc::now().date_naive();
        let start = end - ChronoDuration::days(7);
        let points = self.fetch_with_retry(symbol, start, end)?;
        points
            .last()
            .map(|p| p.close)
            .ok_or_else(|| PriceError::QuoteUnavailable {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_json(closes: &str, adj: Option<&str>, timestamps: &str) -> String {
        let adjclose = match adj {
            Some(a) => format!(r#","adjclose":[{{"adjclose":{a}}}]"#),
            None => String::new(),
        };
        format!(
            r#"{{"chart":{{"result":[{{"timestamp":{timestamps},
                "indicators":{{"quote":[{{"close":{closes}}}]{adjclose}}}}}],"error":null}}}}"#
        )
    }

    #[test]
    fn parse_prefers_adjusted_close() {
        // 2025-01-02, 2025-01-03
        let json = chart_json(
            "[100.0,101.0]",
            Some("[99.0,100.5]"),
            "[1735804800,1735891200]",
        );
        let resp: ChartResponse = serde_json::from_str(&json).unwrap();
        let points = YahooProvider::parse_response("SXLK.L", resp).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 99.0);
        assert_eq!(points[1].close, 100.5);
    }

    #[test]
    fn parse_drops_null_and_nonpositive_closes() {
        let json = chart_json(
            "[100.0,null,0.0,102.0]",
            None,
            "[1735804800,1735891200,1735977600,1736150400]",
        );
        let resp: ChartResponse = serde_json::from_str(&json).unwrap();
        let points = YahooProvider::parse_response("SXLK.L", resp).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 100.0);
        assert_eq!(points[1].close, 102.0);
    }

    #[test]
    fn parse_not_found_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_response("NOPE.L", resp).unwrap_err();
        assert!(matches!(err, PriceError::SymbolNotFound { .. }));
    }

    #[test]
    fn parse_all_null_closes_is_unavailable() {
        let json = chart_json("[null,null]", None, "[1735804800,1735891200]");
        let resp: ChartResponse = serde_json::from_str(&json).unwrap();
        let err = YahooProvider::parse_response("SXLK.L", resp).unwrap_err();
        assert!(matches!(err, PriceError::QuoteUnavailable { .. }));
    }

    #[test]
    fn chart_url_contains_range_and_interval() {
        let url = YahooProvider::chart_url(
            "SXLK.L",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        );
        assert!(url.contains("/v8/finance/chart/SXLK.L"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("period1="));
        assert!(url.contains("period2="));
    }
}
