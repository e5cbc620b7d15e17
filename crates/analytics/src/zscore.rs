use core_types::Series;
use serde::{Deserialize, Serialize};

/// Which standard deviation formula the z-score divides by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersionEstimator {
    /// `n - 1` denominator. A single observation has no sample dispersion.
    #[default]
    Sample,
    /// `n` denominator.
    Population,
}

impl DispersionEstimator {
    fn denominator(&self, n: usize) -> f64 {
        match self {
            DispersionEstimator::Sample => n as f64 - 1.0,
            DispersionEstimator::Population => n as f64,
        }
    }
}

/// Measures how far the latest close sits from the mean of the whole series,
/// in units of standard deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreCalculator {
    estimator: DispersionEstimator,
}

impl ZScoreCalculator {
    pub fn new(estimator: DispersionEstimator) -> Self {
        Self { estimator }
    }

    /// Returns `(last_close - mean) / stdev`, or NaN when the series is empty
    /// or has no dispersion.
    pub fn score(&self, series: &Series) -> f64 {
        let Some(last) = series.last() else {
            return f64::NAN;
        };

        // A constant series can leave a rounding residue in the mean, so
        // degeneracy is detected on the raw values.
        let first = last.close;
        if series.closes().all(|close| close == first) {
            return f64::NAN;
        }

        let denominator = self.estimator.denominator(series.len());
        if denominator <= 0.0 {
            return f64::NAN;
        }

        let n = series.len() as f64;
        let mean = series.closes().sum::<f64>() / n;
        let variance = series
            .closes()
            .map(|close| (close - mean) * (close - mean))
            .sum::<f64>()
            / denominator;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return f64::NAN;
        }

        (last.close - mean) / std_dev
    }
}
