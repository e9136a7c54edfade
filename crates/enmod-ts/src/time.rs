//! Problem time and small chrono helpers.

use crate::error::{TsError, TsResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// The point in time a problem window starts at.
///
/// Two clocks advance together: `data_time` selects level data (installed
/// capacity, fuel prices of a given year) while `scenario_time` selects
/// profile data (weather year, inflow year). Keeping them apart lets one
/// data year be simulated against many weather years.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProbTime {
    pub data_time: NaiveDateTime,
    pub scenario_time: NaiveDateTime,
}

impl ProbTime {
    pub fn new(data_time: NaiveDateTime, scenario_time: NaiveDateTime) -> Self {
        Self {
            data_time,
            scenario_time,
        }
    }

    /// Both clocks at the same instant.
    pub fn single(time: NaiveDateTime) -> Self {
        Self::new(time, time)
    }

    /// Move both clocks forward by `delta`.
    pub fn shifted(&self, delta: Duration) -> Self {
        Self::new(self.data_time + delta, self.scenario_time + delta)
    }
}

impl Add<Duration> for ProbTime {
    type Output = ProbTime;

    fn add(self, rhs: Duration) -> ProbTime {
        self.shifted(rhs)
    }
}

impl std::fmt::Display for ProbTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.data_time == self.scenario_time {
            write!(f, "{}", self.data_time)
        } else {
            write!(f, "data {} / scenario {}", self.data_time, self.scenario_time)
        }
    }
}

/// Fixed instant used to evaluate parameters that do not depend on time.
pub fn reference_time() -> ProbTime {
    ProbTime::default()
}

/// Length of `delta` in (fractional) hours.
pub fn hours(delta: Duration) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000.0
}

/// Build a duration from fractional hours, rounded to the millisecond.
pub fn from_hours(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a timestamp as used in datasets and on the command line.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM`
/// and plain dates (midnight).
pub fn parse_datetime(input: &str) -> TsResult<NaiveDateTime> {
    let trimmed = input.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TsError::InvalidTimestamp(input.to_string()))
}
