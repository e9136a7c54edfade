use thiserror::Error;

/// Errors raised while constructing or querying time structures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TsError {
    /// Horizon definition is unusable (no periods, non-positive durations, ...)
    #[error("Invalid horizon: {0}")]
    InvalidHorizon(String),

    /// Time vector definition is unusable (length mismatch, unsorted index, ...)
    #[error("Invalid time vector: {0}")]
    InvalidTimeVector(String),

    /// Period index outside the horizon
    #[error("Period {index} out of range for horizon with {len} periods")]
    PeriodOutOfRange { index: usize, len: usize },

    /// Two horizons cannot be mapped onto each other
    #[error("Incompatible horizons: {0}")]
    IncompatibleHorizons(String),

    /// Timestamp string could not be parsed
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

pub type TsResult<T> = Result<T, TsError>;
