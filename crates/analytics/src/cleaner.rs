use chrono::{Datelike, NaiveTime, Weekday};
use core_types::Series;
use serde::{Deserialize, Serialize};

const DEFAULT_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(time) => time,
    None => panic!("09:30 is a valid time of day"),
};

const DEFAULT_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(time) => time,
    None => panic!("16:00 is a valid time of day"),
};

/// The regular trading session in local wall-clock time.
///
/// The window is half-open: a bar stamped exactly at `open` is kept, a bar
/// stamped exactly at `close` is after-hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl SessionWindow {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time < self.close
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN,
            close: DEFAULT_CLOSE,
        }
    }
}

/// Restricts intraday series to weekday trading sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesCleaner {
    session: SessionWindow,
}

impl SeriesCleaner {
    pub fn with_session(session: SessionWindow) -> Self {
        Self { session }
    }

    /// Cleans a raw series.
    ///
    /// Daily-or-coarser series, and any series when after-hours exclusion is
    /// off, pass through untouched. Otherwise weekend points are dropped first,
    /// then points outside the session window. The timestamps are taken as-is;
    /// no timezone conversion happens here. Never fails; may return an empty
    /// series.
    pub fn clean(&self, raw: Series, interval_is_intraday: bool, exclude_afterhours: bool) -> Series {
        if !interval_is_intraday || !exclude_afterhours {
            return raw;
        }

        let before = raw.len();
        let cleaned = raw
            .retain(|point| is_trading_day(point.timestamp.weekday()))
            .retain(|point| self.session.contains(point.timestamp.time()));

        tracing::debug!(
            before,
            after = cleaned.len(),
            "Trimmed intraday series to the trading session."
        );
        cleaned
    }
}

fn is_trading_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}
