//! # enmod-ts: time structure for rolling-horizon models
//!
//! - [`ProbTime`]: the two-clock start time of a problem window
//! - [`Horizon`] / [`SequentialHorizon`]: period layout of a window
//! - [`TimeVector`]: constant, infinite and rotating step series
//! - [`Param`]: magnitudes derived from time vectors, with the
//!   constant/durational predicates used to decide when a problem term must be
//!   refreshed

pub mod error;
pub mod horizon;
pub mod param;
pub mod time;
pub mod timevector;

pub use error::{TsError, TsResult};
pub use horizon::{subdivision, Horizon, SequentialHorizon};
pub use param::{
    constant_value, must_dynamic_update, period_value, ConstantParam, MWToGWhSeriesParam,
    MeanSeriesParam, Param,
};
pub use time::{from_hours, hours, parse_datetime, reference_time, ProbTime};
pub use timevector::{ConstantTimeVector, InfiniteTimeVector, RotatingTimeVector, TimeVector};

// Re-exported so dependents share one chrono version for durations and timestamps.
pub use chrono::{Duration, NaiveDateTime};
