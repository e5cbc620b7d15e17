use crate::error::AnalyticsError;
use crate::ranker::nan_last;
use core_types::RankedEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Latest-price and period-return figures for one ranked instrument.
///
/// This is the data behind the snapshot (heatmap) and returns (bar chart)
/// views. Every price field is NaN when the series is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSummary {
    pub symbol: String,
    pub display_name: String,
    pub points: usize,
    pub first_close: f64,
    pub last_close: f64,
    pub period_high: f64,
    pub return_pct: f64,
    pub score: f64,
}

pub fn summarize(entry: &RankedEntry) -> InstrumentSummary {
    let series = &entry.series;
    let first_close = series.first().map_or(f64::NAN, |p| p.close);
    let last_close = series.last().map_or(f64::NAN, |p| p.close);
    let period_high = series
        .points()
        .iter()
        .map(|p| p.high)
        .fold(f64::NAN, f64::max);

    let return_pct = if first_close == 0.0 {
        f64::NAN
    } else {
        (last_close / first_close - 1.0) * 100.0
    };

    InstrumentSummary {
        symbol: entry.instrument.symbol.clone(),
        display_name: entry.instrument.display_name.clone(),
        points: series.len(),
        first_close,
        last_close,
        period_high,
        return_pct,
        score: entry.score,
    }
}

/// The column a summary view is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Ascending z-score, the ranker's own order.
    #[default]
    #[serde(rename = "zscore", alias = "z_score")]
    ZScore,
    /// Biggest period gain first.
    Return,
    /// Highest latest price first.
    #[serde(alias = "last")]
    LastPrice,
    /// Alphabetical by display name.
    Name,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::ZScore => "zscore",
            SortKey::Return => "return",
            SortKey::LastPrice => "last",
            SortKey::Name => "name",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zscore" | "z_score" | "z-score" => Ok(SortKey::ZScore),
            "return" | "returns" => Ok(SortKey::Return),
            "last" | "last_price" | "price" => Ok(SortKey::LastPrice),
            "name" => Ok(SortKey::Name),
            _ => Err(AnalyticsError::UnknownSortKey(s.to_string())),
        }
    }
}

/// Stable sort of summaries by `key`. Missing values (NaN) always go last,
/// whichever direction the key sorts in.
pub fn sort_summaries(summaries: &mut [InstrumentSummary], key: SortKey) {
    summaries.sort_by(|a, b| match key {
        SortKey::ZScore => nan_last(a.score, b.score),
        SortKey::Return => descending_nan_last(a.return_pct, b.return_pct),
        SortKey::LastPrice => descending_nan_last(a.last_close, b.last_close),
        SortKey::Name => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
    });
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => nan_last(b, a),
        _ => nan_last(a, b),
    }
}
