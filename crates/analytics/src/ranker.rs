use crate::cleaner::SeriesCleaner;
use crate::error::AnalyticsError;
use crate::zscore::ZScoreCalculator;
use core_types::{Instrument, RankedEntry, Series};
use std::cmp::Ordering;
use std::collections::HashSet;

/// How the raw series should be cleaned before scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankerConfig {
    pub interval_is_intraday: bool,
    pub exclude_afterhours: bool,
}

/// Orders instruments by the z-score of their latest close.
///
/// The ranker is a stateless calculator: it owns only its configuration, so
/// ranking the same snapshot twice always yields the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker {
    config: RankerConfig,
    cleaner: SeriesCleaner,
    calculator: ZScoreCalculator,
}

impl Ranker {
    pub fn new(config: RankerConfig, cleaner: SeriesCleaner, calculator: ZScoreCalculator) -> Self {
        Self {
            config,
            cleaner,
            calculator,
        }
    }

    pub fn config(&self) -> RankerConfig {
        self.config
    }

    /// Cleans and scores every entry, then sorts ascending by score.
    ///
    /// NaN scores (no data, no dispersion) sort after every finite score.
    /// The sort is stable, so ties and NaN entries keep their input order.
    /// Nothing is dropped: the output has exactly one entry per input.
    ///
    /// Returns an error if two entries share a symbol.
    pub fn rank<I>(&self, entries: I) -> Result<Vec<RankedEntry>, AnalyticsError>
    where
        I: IntoIterator<Item = (Instrument, Series)>,
    {
        let entries: Vec<(Instrument, Series)> = entries.into_iter().collect();
        ensure_unique_symbols(&entries)?;

        let mut ranked: Vec<RankedEntry> = entries
            .into_iter()
            .map(|(instrument, raw)| {
                let series = self.cleaner.clean(
                    raw,
                    self.config.interval_is_intraday,
                    self.config.exclude_afterhours,
                );
                let score = self.calculator.score(&series);
                RankedEntry {
                    instrument,
                    series,
                    score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| nan_last(a.score, b.score));

        let unscored = ranked.iter().filter(|entry| !entry.has_score()).count();
        tracing::debug!(
            total = ranked.len(),
            unscored,
            "Ranked instruments by z-score."
        );

        Ok(ranked)
    }
}

fn ensure_unique_symbols(entries: &[(Instrument, Series)]) -> Result<(), AnalyticsError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (instrument, _) in entries {
        if !seen.insert(instrument.symbol.as_str()) {
            return Err(AnalyticsError::DuplicateSymbol(instrument.symbol.clone()));
        }
    }
    Ok(())
}

/// Ascending comparison in which NaN is greater than every number,
/// including positive infinity, and equal to itself.
pub fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use core_types::PricePoint;
    use proptest::prelude::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(values: &[f64]) -> Series {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, close)| {
                PricePoint::new(start() + chrono::Duration::days(i as i64), *close, *close)
            })
            .collect();
        Series::new(points).unwrap()
    }

    /// Builds a series whose sample z-score is `z`, by bisecting on the final
    /// close appended to a fixed history. The score is monotonic in that value.
    fn series_with_score(z: f64) -> Series {
        let mut history: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 2.0 }).collect();
        let calc = ZScoreCalculator::default();
        let (mut lo, mut hi) = (-100.0, 100.0);
        for _ in 0..200 {
            let mid = (lo + hi) / 2.0;
            history.push(mid);
            let s = calc.score(&series(&history));
            history.pop();
            if s < z {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        history.push((lo + hi) / 2.0);
        series(&history)
    }

    fn symbols(ranked: &[RankedEntry]) -> Vec<&str> {
        ranked.iter().map(|e| e.instrument.symbol.as_str()).collect()
    }

    #[test]
    fn flat_history_ranks_after_finite_scores() {
        let input = vec![
            (Instrument::new("A", "A"), series(&[5.0, 5.0, 5.0, 5.0])),
            (Instrument::new("B", "B"), series_with_score(-2.1)),
            (Instrument::new("C", "C"), series_with_score(1.3)),
        ];
        let ranked = Ranker::default().rank(input).unwrap();

        assert_eq!(symbols(&ranked), vec!["B", "C", "A"]);
        assert!((ranked[0].score + 2.1).abs() < 1e-6);
        assert!((ranked[1].score - 1.3).abs() < 1e-6);
        assert!(ranked[2].score.is_nan());
    }

    #[test]
    fn empty_series_is_kept_and_ranked_last() {
        let input = vec![
            (Instrument::new("Empty", "E"), Series::empty()),
            (Instrument::new("Up", "U"), series(&[1.0, 2.0, 3.0])),
        ];
        let ranked = Ranker::default().rank(input).unwrap();
        assert_eq!(symbols(&ranked), vec!["U", "E"]);
        assert!(ranked[1].series.is_empty());
    }

    #[test]
    fn nan_entries_keep_input_order() {
        let input = vec![
            (Instrument::new("X", "X"), Series::empty()),
            (Instrument::new("Y", "Y"), series(&[3.0, 3.0])),
            (Instrument::new("Z", "Z"), Series::empty()),
        ];
        let ranked = Ranker::default().rank(input).unwrap();
        assert_eq!(symbols(&ranked), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let input = vec![
            (Instrument::new("First", "F"), series(&[1.0, 2.0, 3.0])),
            (Instrument::new("Second", "S"), series(&[10.0, 20.0, 30.0])),
            (Instrument::new("Low", "L"), series(&[3.0, 2.0, 1.0])),
        ];
        let ranked = Ranker::default().rank(input).unwrap();
        assert_eq!(symbols(&ranked), vec!["L", "F", "S"]);
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let input = vec![
            (Instrument::new("Gold", "GC=F"), series(&[1.0, 2.0])),
            (Instrument::new("Gold again", "GC=F"), series(&[2.0, 1.0])),
        ];
        assert_eq!(
            Ranker::default().rank(input).unwrap_err(),
            AnalyticsError::DuplicateSymbol("GC=F".to_string())
        );
    }

    #[test]
    fn cleaning_runs_before_scoring() {
        // Friday 2024-03-08 session bars, then a Saturday spike.
        let day = |d: u32, h: u32| {
            NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let raw = Series::new(vec![
            PricePoint::new(day(8, 10), 1.0, 1.0),
            PricePoint::new(day(8, 11), 2.0, 2.0),
            PricePoint::new(day(8, 12), 3.0, 3.0),
            PricePoint::new(day(9, 12), 100.0, 100.0),
        ])
        .unwrap();

        let ranker = Ranker::new(
            RankerConfig {
                interval_is_intraday: true,
                exclude_afterhours: true,
            },
            SeriesCleaner::default(),
            ZScoreCalculator::default(),
        );
        let ranked = ranker.rank(vec![(Instrument::from_symbol("GC=F"), raw)]).unwrap();

        assert_eq!(ranked[0].series.len(), 3);
        assert!((ranked[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nan_last_orders_nan_after_infinity() {
        assert_eq!(nan_last(f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(nan_last(f64::NEG_INFINITY, f64::NAN), Ordering::Less);
        assert_eq!(nan_last(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(nan_last(-1.0, 1.0), Ordering::Less);
    }

    fn arb_series() -> impl Strategy<Value = Series> {
        prop_oneof![
            Just(Series::empty()),
            prop::collection::vec(0.01f64..10_000.0, 1..40).prop_map(|v| series(&v)),
            (0.01f64..10_000.0, 1usize..20).prop_map(|(c, n)| series(&vec![c; n])),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn ranking_preserves_length_and_puts_nan_last(all in prop::collection::vec(arb_series(), 0..12)) {
            let input: Vec<_> = all
                .into_iter()
                .enumerate()
                .map(|(i, s)| (Instrument::from_symbol(format!("SYM{i}")), s))
                .collect();
            let expected_len = input.len();

            let ranked = Ranker::default().rank(input.clone()).unwrap();
            prop_assert_eq!(ranked.len(), expected_len);

            let first_nan = ranked.iter().position(|e| e.score.is_nan()).unwrap_or(ranked.len());
            prop_assert!(ranked[first_nan..].iter().all(|e| e.score.is_nan()));
            prop_assert!(ranked[..first_nan].windows(2).all(|w| w[0].score <= w[1].score));

            let again = Ranker::default().rank(input).unwrap();
            prop_assert_eq!(symbols(&ranked), symbols(&again));
        }
    }
}
