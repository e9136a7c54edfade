//! Time vectors: values indexed by time, queried as period averages.

use crate::error::{TsError, TsResult};
use chrono::{Duration, NaiveDateTime};
use std::fmt::Debug;

pub trait TimeVector: Debug + Send + Sync {
    /// True when the vector has the same value at every instant.
    fn is_constant(&self) -> bool;

    /// Mean value over `[start, start + delta)`. A zero-length window returns
    /// the value at `start`.
    fn average(&self, start: NaiveDateTime, delta: Duration) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantTimeVector {
    pub value: f64,
}

impl ConstantTimeVector {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl TimeVector for ConstantTimeVector {
    fn is_constant(&self) -> bool {
        true
    }

    fn average(&self, _start: NaiveDateTime, _delta: Duration) -> f64 {
        self.value
    }
}

/// Step series valid for all time: the first value extends backwards and
/// the last value extends forwards.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteTimeVector {
    index: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl InfiniteTimeVector {
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<f64>) -> TsResult<Self> {
        check_series(&index, &values)?;
        Ok(Self { index, values })
    }
}

impl TimeVector for InfiniteTimeVector {
    fn is_constant(&self) -> bool {
        all_equal(&self.values)
    }

    fn average(&self, start: NaiveDateTime, delta: Duration) -> f64 {
        if delta <= Duration::zero() {
            return value_at(&self.index, &self.values, start);
        }
        step_integral(&self.index, &self.values, start, start + delta)
            / delta.num_milliseconds() as f64
    }
}

/// Step series over `[index[0], stop)` that repeats forever in both
/// directions, typically one weather year re-used for every simulated year.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatingTimeVector {
    index: Vec<NaiveDateTime>,
    values: Vec<f64>,
    stop: NaiveDateTime,
}

impl RotatingTimeVector {
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<f64>, stop: NaiveDateTime) -> TsResult<Self> {
        check_series(&index, &values)?;
        if let Some(last) = index.last() {
            if stop <= *last {
                return Err(TsError::InvalidTimeVector(format!(
                    "stop {stop} must be after the last index {last}"
                )));
            }
        }
        Ok(Self {
            index,
            values,
            stop,
        })
    }

    fn period_ms(&self) -> i64 {
        (self.stop - self.index[0]).num_milliseconds()
    }

    fn rotate(&self, t: NaiveDateTime) -> NaiveDateTime {
        let offset = (t - self.index[0])
            .num_milliseconds()
            .rem_euclid(self.period_ms());
        self.index[0] + Duration::milliseconds(offset)
    }
}

impl TimeVector for RotatingTimeVector {
    fn is_constant(&self) -> bool {
        all_equal(&self.values)
    }

    fn average(&self, start: NaiveDateTime, delta: Duration) -> f64 {
        let mut cursor = self.rotate(start);
        if delta <= Duration::zero() {
            return value_at(&self.index, &self.values, cursor);
        }
        let mut remaining = delta.num_milliseconds();
        let mut total = 0.0;
        while remaining > 0 {
            let chunk = remaining.min((self.stop - cursor).num_milliseconds());
            let end = cursor + Duration::milliseconds(chunk);
            total += step_integral(&self.index, &self.values, cursor, end);
            remaining -= chunk;
            cursor = self.index[0];
        }
        total / delta.num_milliseconds() as f64
    }
}

fn check_series(index: &[NaiveDateTime], values: &[f64]) -> TsResult<()> {
    if index.is_empty() {
        return Err(TsError::InvalidTimeVector("empty index".into()));
    }
    if index.len() != values.len() {
        return Err(TsError::InvalidTimeVector(format!(
            "index has {} points but {} values were given",
            index.len(),
            values.len()
        )));
    }
    if index.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(TsError::InvalidTimeVector(
            "index must be strictly increasing".into(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(TsError::InvalidTimeVector("non-finite value".into()));
    }
    Ok(())
}

fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

fn value_at(index: &[NaiveDateTime], values: &[f64], t: NaiveDateTime) -> f64 {
    let count = index.partition_point(|point| *point <= t);
    values[count.saturating_sub(1)]
}

/// Integral (value x milliseconds) of the step function over `[a, b)`.
fn step_integral(
    index: &[NaiveDateTime],
    values: &[f64],
    a: NaiveDateTime,
    b: NaiveDateTime,
) -> f64 {
    let mut total = 0.0;
    let mut cursor = a;
    while cursor < b {
        let count = index.partition_point(|point| *point <= cursor);
        let segment_end = match index.get(count) {
            Some(next) if *next < b => *next,
            _ => b,
        };
        total += values[count.saturating_sub(1)] * (segment_end - cursor).num_milliseconds() as f64;
        cursor = segment_end;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_datetime;

    fn t(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_infinite_average_spans_steps() {
        let tv = InfiniteTimeVector::new(
            vec![t("2024-01-01T00:00:00"), t("2024-01-01T12:00:00")],
            vec![10.0, 20.0],
        )
        .unwrap();
        assert!(!tv.is_constant());
        assert_eq!(tv.average(t("2024-01-01T00:00:00"), Duration::hours(24)), 15.0);
        assert_eq!(tv.average(t("2024-01-01T06:00:00"), Duration::hours(6)), 10.0);
        // extends backwards and forwards
        assert_eq!(tv.average(t("2023-06-01T00:00:00"), Duration::hours(1)), 10.0);
        assert_eq!(tv.average(t("2030-01-01T00:00:00"), Duration::zero()), 20.0);
    }

    #[test]
    fn test_infinite_rejects_bad_series() {
        assert!(InfiniteTimeVector::new(vec![], vec![]).is_err());
        assert!(InfiniteTimeVector::new(vec![t("2024-01-01")], vec![1.0, 2.0]).is_err());
        assert!(InfiniteTimeVector::new(
            vec![t("2024-01-02"), t("2024-01-01")],
            vec![1.0, 2.0]
        )
        .is_err());
    }

    #[test]
    fn test_rotating_wraps_around() {
        let tv = RotatingTimeVector::new(
            vec![t("2000-01-01T00:00:00"), t("2000-01-01T12:00:00")],
            vec![1.0, 3.0],
            t("2000-01-02T00:00:00"),
        )
        .unwrap();
        // one year later maps to the same profile position
        assert_eq!(tv.average(t("2001-06-15T13:00:00"), Duration::zero()), 3.0);
        // window crossing the rotation boundary
        let avg = tv.average(t("2000-01-01T18:00:00"), Duration::hours(12));
        assert_eq!(avg, 2.0);
    }

    #[test]
    fn test_constant_detection() {
        let flat = InfiniteTimeVector::new(
            vec![t("2024-01-01"), t("2024-02-01")],
            vec![5.0, 5.0],
        )
        .unwrap();
        assert!(flat.is_constant());
        assert!(ConstantTimeVector::new(2.0).is_constant());
    }
}
