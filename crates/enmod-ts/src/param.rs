//! Parameters: time-dependent magnitudes evaluated per horizon period.
//!
//! Two predicates drive how model objects write a parameter into a problem:
//!
//! - **constant**: evaluates identically for every window of the rolling
//!   horizon, so it can be written once.
//! - **durational**: the value scales with the length of the queried period
//!   (an energy amount rather than a rate), so it changes whenever period
//!   lengths change.
//!
//! [`must_dynamic_update`] combines both with the horizon's period structure.

use crate::error::TsResult;
use crate::horizon::Horizon;
use crate::time::{hours, reference_time, ProbTime};
use crate::timevector::TimeVector;
use chrono::Duration;
use std::fmt::Debug;
use std::sync::Arc;

pub trait Param: Debug + Send + Sync {
    fn is_constant(&self) -> bool;

    fn is_durational(&self) -> bool;

    /// Value for the period `[start, start + delta)`.
    fn value(&self, start: &ProbTime, delta: Duration) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantParam {
    pub value: f64,
}

impl ConstantParam {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Param for ConstantParam {
    fn is_constant(&self) -> bool {
        true
    }

    fn is_durational(&self) -> bool {
        false
    }

    fn value(&self, _start: &ProbTime, _delta: Duration) -> f64 {
        self.value
    }
}

/// `level(data time) * profile(scenario time)`, both averaged over the period.
#[derive(Debug, Clone)]
pub struct MeanSeriesParam {
    pub level: Arc<dyn TimeVector>,
    pub profile: Arc<dyn TimeVector>,
}

impl MeanSeriesParam {
    pub fn new(level: Arc<dyn TimeVector>, profile: Arc<dyn TimeVector>) -> Self {
        Self { level, profile }
    }
}

impl Param for MeanSeriesParam {
    fn is_constant(&self) -> bool {
        self.level.is_constant() && self.profile.is_constant()
    }

    fn is_durational(&self) -> bool {
        false
    }

    fn value(&self, start: &ProbTime, delta: Duration) -> f64 {
        self.level.average(start.data_time, delta)
            * self.profile.average(start.scenario_time, delta)
    }
}

/// Power series in MW turned into energy in GWh for the queried period.
#[derive(Debug, Clone)]
pub struct MWToGWhSeriesParam {
    pub level: Arc<dyn TimeVector>,
    pub profile: Arc<dyn TimeVector>,
}

impl MWToGWhSeriesParam {
    pub fn new(level: Arc<dyn TimeVector>, profile: Arc<dyn TimeVector>) -> Self {
        Self { level, profile }
    }
}

impl Param for MWToGWhSeriesParam {
    fn is_constant(&self) -> bool {
        self.level.is_constant() && self.profile.is_constant()
    }

    fn is_durational(&self) -> bool {
        true
    }

    fn value(&self, start: &ProbTime, delta: Duration) -> f64 {
        let mw = self.level.average(start.data_time, delta)
            * self.profile.average(start.scenario_time, delta);
        mw * hours(delta) / 1000.0
    }
}

/// True when a term built from `param` on `horizon` has to be rewritten at
/// every step instead of once.
pub fn must_dynamic_update(param: &dyn Param, horizon: &dyn Horizon) -> bool {
    !param.is_constant() || (param.is_durational() && !horizon.has_constant_durations())
}

/// Value of `param` in period `t` of the window starting at `start`.
pub fn period_value(
    param: &dyn Param,
    horizon: &dyn Horizon,
    start: &ProbTime,
    t: usize,
) -> TsResult<f64> {
    let (offset, duration) = horizon.start_duration(t)?;
    Ok(param.value(&start.shifted(offset), duration))
}

/// Value of a param that does not need dynamic updates, in period `t`.
pub fn constant_value(param: &dyn Param, horizon: &dyn Horizon, t: usize) -> TsResult<f64> {
    period_value(param, horizon, &reference_time(), t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::SequentialHorizon;
    use crate::time::parse_datetime;
    use crate::timevector::{ConstantTimeVector, InfiniteTimeVector};

    fn constant_tv(value: f64) -> Arc<dyn TimeVector> {
        Arc::new(ConstantTimeVector::new(value))
    }

    #[test]
    fn test_constant_param_never_needs_update() {
        let param = ConstantParam::new(100.0);
        let uneven =
            SequentialHorizon::new(&[(1, Duration::hours(1)), (1, Duration::hours(5))]).unwrap();
        assert!(!must_dynamic_update(&param, &uneven));
        assert_eq!(constant_value(&param, &uneven, 1).unwrap(), 100.0);
    }

    #[test]
    fn test_durational_param_depends_on_period_length() {
        let param = MWToGWhSeriesParam::new(constant_tv(500.0), constant_tv(1.0));
        let even = SequentialHorizon::uniform(3, Duration::hours(2)).unwrap();
        let uneven =
            SequentialHorizon::new(&[(1, Duration::hours(2)), (1, Duration::hours(4))]).unwrap();

        assert!(param.is_constant());
        assert!(!must_dynamic_update(&param, &even));
        assert!(must_dynamic_update(&param, &uneven));
        assert_eq!(constant_value(&param, &even, 0).unwrap(), 1.0);
        assert_eq!(constant_value(&param, &uneven, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_series_param_uses_both_clocks() {
        let level = Arc::new(
            InfiniteTimeVector::new(
                vec![parse_datetime("2025-01-01").unwrap(), parse_datetime("2030-01-01").unwrap()],
                vec![10.0, 20.0],
            )
            .unwrap(),
        );
        let profile = Arc::new(
            InfiniteTimeVector::new(
                vec![parse_datetime("1990-01-01").unwrap(), parse_datetime("1991-01-01").unwrap()],
                vec![0.5, 1.0],
            )
            .unwrap(),
        );
        let param = MeanSeriesParam::new(level, profile);
        assert!(!param.is_constant());

        let start = ProbTime::new(
            parse_datetime("2030-06-01").unwrap(),
            parse_datetime("1990-06-01").unwrap(),
        );
        let horizon = SequentialHorizon::uniform(2, Duration::hours(1)).unwrap();
        assert!(must_dynamic_update(&param, &horizon));
        assert_eq!(period_value(&param, &horizon, &start, 1).unwrap(), 10.0);
    }
}
