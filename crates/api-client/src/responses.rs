use crate::error::ApiError;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use core_types::{PricePoint, Series};
use serde::Deserialize;
use std::collections::BTreeMap;

// Using `#[serde(rename_all = "camelCase")]` where the provider's JSON keys are camelCase.

/// The body of `GET /v8/finance/chart/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// Represents an error object returned inside the chart envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub symbol: String,
    /// Seconds to add to UTC to get the exchange's wall-clock time.
    #[serde(default)]
    pub gmtoffset: i64,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
    #[serde(default)]
    pub adjclose: Vec<AdjCloseColumn>,
}

/// Column-oriented OHLC values; any cell can be `null` for a missing bar.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub close: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjCloseColumn {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Converts the provider payload into a validated `Series`.
    ///
    /// Timestamps are converted into exchange-local wall time through the
    /// exchange's time zone, so bars on either side of a DST change keep their
    /// session time. `gmtoffset` is only used when the zone is missing or
    /// unknown. The plain close
    /// column is preferred; the adjusted close is used only when the plain one
    /// is absent. Bars without a close are skipped, a missing high falls back
    /// to the close, and a repeated timestamp keeps its last bar.
    pub fn into_series(self) -> Result<Series, ApiError> {
        if let Some(error) = self.chart.error {
            return Err(ApiError::Provider(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ApiError::InvalidData("chart response has no result".to_string()))?;

        if result.timestamp.is_empty() {
            return Ok(Series::empty());
        }

        let quote = result.indicators.quote.first();
        let closes = quote
            .and_then(|q| q.close.as_ref())
            .or_else(|| result.indicators.adjclose.first().map(|a| &a.adjclose))
            .ok_or_else(|| ApiError::InvalidData("chart response has no close column".to_string()))?;
        let highs: &[Option<f64>] = quote.map_or(&[], |q| q.high.as_slice());

        let clock = ExchangeClock::from_meta(&result.meta);
        let mut by_time: BTreeMap<NaiveDateTime, PricePoint> = BTreeMap::new();
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let Some(close) = closes.get(i).copied().flatten().filter(|c| c.is_finite()) else {
                continue;
            };
            let high = highs
                .get(i)
                .copied()
                .flatten()
                .filter(|h| h.is_finite())
                .unwrap_or(close);
            let timestamp = clock.local_time(ts)?;
            by_time.insert(timestamp, PricePoint::new(timestamp, close, high));
        }

        let skipped = result.timestamp.len() - by_time.len();
        if skipped > 0 {
            tracing::debug!(
                symbol = %result.meta.symbol,
                skipped,
                "Dropped bars without a close or with a repeated timestamp."
            );
        }

        Ok(Series::new(by_time.into_values().collect())?)
    }
}

/// Turns provider epoch seconds into exchange wall-clock time.
#[derive(Debug, Clone, Copy)]
enum ExchangeClock {
    Zone(Tz),
    FixedOffset(i64),
}

impl ExchangeClock {
    fn from_meta(meta: &ChartMeta) -> Self {
        match meta.exchange_timezone_name.as_deref() {
            Some(name) => match name.parse::<Tz>() {
                Ok(zone) => ExchangeClock::Zone(zone),
                Err(_) => {
                    tracing::debug!(
                        symbol = %meta.symbol,
                        zone = name,
                        "Unknown exchange time zone, falling back to gmtoffset."
                    );
                    ExchangeClock::FixedOffset(meta.gmtoffset)
                }
            },
            None => ExchangeClock::FixedOffset(meta.gmtoffset),
        }
    }

    fn local_time(self, ts: i64) -> Result<NaiveDateTime, ApiError> {
        let invalid = || ApiError::InvalidData(format!("Invalid timestamp: {}", ts));
        match self {
            ExchangeClock::Zone(zone) => {
                let utc = DateTime::from_timestamp(ts, 0).ok_or_else(invalid)?;
                Ok(zone.from_utc_datetime(&utc.naive_utc()).naive_local())
            }
            ExchangeClock::FixedOffset(offset) => {
                let shifted = ts.checked_add(offset).ok_or_else(invalid)?;
                Ok(DateTime::from_timestamp(shifted, 0)
                    .ok_or_else(invalid)?
                    .naive_utc())
            }
        }
    }
}
