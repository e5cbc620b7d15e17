use crate::error::CoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single observation of an instrument's price.
///
/// The timestamp is the wall-clock time of the venue the series came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub high: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64, high: f64) -> Self {
        Self {
            timestamp,
            close,
            high,
        }
    }
}

/// The price history of one instrument, strictly ordered by timestamp.
///
/// A `Series` can only be built through [`Series::new`], which rejects
/// unsorted or duplicated timestamps instead of silently reordering them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct Series {
    points: Vec<PricePoint>,
}

impl Series {
    /// Validates and wraps a vector of points.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, CoreError> {
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(CoreError::MalformedSeries { index: index + 1 });
        }
        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }

    /// Keeps only the points matching `keep`. Dropping points from an ordered
    /// series leaves it ordered, so no re-validation is needed.
    pub fn retain<F>(mut self, keep: F) -> Self
    where
        F: FnMut(&PricePoint) -> bool,
    {
        self.points.retain(keep);
        self
    }
}

impl TryFrom<Vec<PricePoint>> for Series {
    type Error = CoreError;

    fn try_from(points: Vec<PricePoint>) -> Result<Self, Self::Error> {
        Series::new(points)
    }
}

impl From<Series> for Vec<PricePoint> {
    fn from(series: Series) -> Self {
        series.points
    }
}

/// A tradable entity. The `symbol` is the lookup key and the identity of the
/// instrument; `display_name` is for presentation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub display_name: String,
    pub symbol: String,
}

impl Instrument {
    pub fn new(display_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            symbol: symbol.into(),
        }
    }

    /// A custom ticker entered by the user is displayed under its own symbol.
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            display_name: symbol.clone(),
            symbol,
        }
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

/// One row of the ranking: the instrument, the (cleaned) series the score was
/// computed from, and the score itself. `score` is NaN when the series is
/// empty or carries no dispersion.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub instrument: Instrument,
    pub series: Series,
    pub score: f64,
}

impl RankedEntry {
    pub fn has_score(&self) -> bool {
        !self.score.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn series_accepts_strictly_ascending_timestamps() {
        let series = Series::new(vec![
            PricePoint::new(at(4, 10), 1.0, 1.0),
            PricePoint::new(at(4, 11), 2.0, 2.5),
            PricePoint::new(at(5, 10), 3.0, 3.0),
        ])
        .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last().map(|p| p.close), Some(3.0));
    }

    #[test]
    fn series_rejects_unsorted_timestamps() {
        let result = Series::new(vec![
            PricePoint::new(at(5, 10), 1.0, 1.0),
            PricePoint::new(at(4, 10), 2.0, 2.0),
        ]);
        assert_eq!(result, Err(CoreError::MalformedSeries { index: 1 }));
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let result = Series::new(vec![
            PricePoint::new(at(4, 10), 1.0, 1.0),
            PricePoint::new(at(4, 11), 1.0, 1.0),
            PricePoint::new(at(4, 11), 2.0, 2.0),
        ]);
        assert_eq!(result, Err(CoreError::MalformedSeries { index: 2 }));
    }

    #[test]
    fn deserializing_a_series_validates_it() {
        let json = r#"[
            {"timestamp":"2024-03-05T10:00:00","close":1.0,"high":1.0},
            {"timestamp":"2024-03-04T10:00:00","close":2.0,"high":2.0}
        ]"#;
        assert!(serde_json::from_str::<Series>(json).is_err());
    }

    #[test]
    fn instruments_are_identified_by_symbol() {
        let gold = Instrument::new("Gold", "GC=F");
        let renamed = Instrument::new("Gold Futures", "GC=F");
        assert_eq!(gold, renamed);

        let custom = Instrument::from_symbol("BTC-USD");
        assert_eq!(custom.display_name, "BTC-USD");
    }
}
