use analytics::{DispersionEstimator, SessionWindow, SortKey};
use chrono::NaiveTime;
use core_types::{Interval, Period};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use crate::catalog::{CatalogEntry, InstrumentGroup};
use crate::error::ConfigError;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; a missing section falls back
/// to its defaults, and an empty `[[catalog]]` falls back to the built-in
/// instrument list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub data_source: DataSourceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// What to fetch and how to rank it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Bar size requested from the provider (e.g. "1d", "15m").
    pub interval: Interval,
    /// How much history to request (e.g. "1y", "max").
    pub period: Period,
    /// Drop weekend and after-hours bars from intraday series before scoring.
    pub exclude_afterhours: bool,
    #[serde(deserialize_with = "deserialize_time")]
    pub session_open: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    pub session_close: NaiveTime,
    /// Default ordering of the snapshot view.
    pub sort_by: SortKey,
    pub estimator: DispersionEstimator,
    /// Catalog groups shown when the command line does not pick any.
    pub groups: Vec<InstrumentGroup>,
}

impl DashboardSettings {
    pub fn session(&self) -> SessionWindow {
        SessionWindow::new(self.session_open, self.session_close)
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        let session = SessionWindow::default();
        Self {
            interval: Interval::default(),
            period: Period::default(),
            exclude_afterhours: true,
            session_open: session.open,
            session_close: session.close,
            sort_by: SortKey::default(),
            estimator: DispersionEstimator::default(),
            groups: vec![InstrumentGroup::Commodity],
        }
    }
}

/// Connection parameters for the market-data provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSourceSettings {
    pub base_url: String,
    /// Upper bound for a single series download.
    pub timeout_secs: u64,
    /// How many downloads may be in flight at once.
    pub max_concurrency: usize,
    pub user_agent: String,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            max_concurrency: 8,
            user_agent: concat!("commodex/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboard.session_open >= self.dashboard.session_close {
            return Err(ConfigError::ValidationError(format!(
                "session_open ({}) must be earlier than session_close ({})",
                self.dashboard.session_open, self.dashboard.session_close
            )));
        }
        if self.data_source.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_source.base_url cannot be empty".to_string(),
            ));
        }
        if self.data_source.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "data_source.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.data_source.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "data_source.max_concurrency must be greater than zero".to_string(),
            ));
        }
        crate::catalog::validate_entries(&self.catalog)
    }
}

/// Accepts both "09:30" and "09:30:00".
fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| format!("invalid time of day '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_daily_full_history_dashboard() {
        let config = Config::default();
        assert_eq!(config.dashboard.interval, Interval::OneDay);
        assert_eq!(config.dashboard.period, Period::Max);
        assert!(config.dashboard.exclude_afterhours);
        assert_eq!(config.dashboard.session(), SessionWindow::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_time_accepts_with_and_without_seconds() {
        assert_eq!(parse_time("09:30"), Ok(NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
        assert_eq!(parse_time("16:00:00"), Ok(NaiveTime::from_hms_opt(16, 0, 0).unwrap()));
        assert!(parse_time("4pm").is_err());
    }

    #[test]
    fn inverted_session_is_rejected() {
        let mut config = Config::default();
        config.dashboard.session_open = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.data_source.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
