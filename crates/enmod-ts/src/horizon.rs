//! Horizons: the period structure of one problem window.

use crate::error::{TsError, TsResult};
use chrono::Duration;
use std::fmt::Debug;

/// Division of a problem window into consecutive periods.
///
/// Offsets are relative to the window start, so the same horizon serves every
/// step of a rolling simulation.
pub trait Horizon: Debug + Send + Sync {
    fn num_periods(&self) -> usize;

    /// Offset from the window start and length of period `t`.
    fn start_duration(&self, t: usize) -> TsResult<(Duration, Duration)>;

    /// True when every period has the same length.
    fn has_constant_durations(&self) -> bool;

    fn total_duration(&self) -> Duration;
}

/// Horizon built from blocks of equally long periods, e.g. 24 hourly periods
/// followed by 6 daily periods.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialHorizon {
    offsets: Vec<Duration>,
    durations: Vec<Duration>,
}

impl SequentialHorizon {
    /// Create a horizon from `(count, duration)` blocks.
    pub fn new(blocks: &[(usize, Duration)]) -> TsResult<Self> {
        if blocks.is_empty() {
            return Err(TsError::InvalidHorizon("no period blocks".into()));
        }
        let mut offsets = Vec::new();
        let mut durations = Vec::new();
        let mut cursor = Duration::zero();
        for (count, duration) in blocks {
            if *count == 0 {
                return Err(TsError::InvalidHorizon(
                    "period block with zero periods".into(),
                ));
            }
            if *duration <= Duration::zero() {
                return Err(TsError::InvalidHorizon(format!(
                    "non-positive period duration {duration}"
                )));
            }
            for _ in 0..*count {
                offsets.push(cursor);
                durations.push(*duration);
                cursor = cursor + *duration;
            }
        }
        Ok(Self { offsets, durations })
    }

    /// `n` periods of length `duration`.
    pub fn uniform(n: usize, duration: Duration) -> TsResult<Self> {
        Self::new(&[(n, duration)])
    }
}

impl Horizon for SequentialHorizon {
    fn num_periods(&self) -> usize {
        self.durations.len()
    }

    fn start_duration(&self, t: usize) -> TsResult<(Duration, Duration)> {
        match (self.offsets.get(t), self.durations.get(t)) {
            (Some(offset), Some(duration)) => Ok((*offset, *duration)),
            _ => Err(TsError::PeriodOutOfRange {
                index: t,
                len: self.durations.len(),
            }),
        }
    }

    fn has_constant_durations(&self) -> bool {
        self.durations.windows(2).all(|pair| pair[0] == pair[1])
    }

    fn total_duration(&self) -> Duration {
        self.durations
            .iter()
            .fold(Duration::zero(), |acc, duration| acc + *duration)
    }
}

/// Number of `fine` periods inside each `coarse` period.
///
/// Both horizons must span the same total duration and every coarse period
/// must start on a fine period boundary with the same count of fine periods.
pub fn subdivision(fine: &dyn Horizon, coarse: &dyn Horizon) -> TsResult<usize> {
    let n_fine = fine.num_periods();
    let n_coarse = coarse.num_periods();
    if n_coarse == 0 || n_fine % n_coarse != 0 {
        return Err(TsError::IncompatibleHorizons(format!(
            "{n_fine} periods cannot be grouped into {n_coarse}"
        )));
    }
    if fine.total_duration() != coarse.total_duration() {
        return Err(TsError::IncompatibleHorizons(format!(
            "total durations differ ({} vs {})",
            fine.total_duration(),
            coarse.total_duration()
        )));
    }
    let ratio = n_fine / n_coarse;
    for t in 0..n_coarse {
        let (coarse_start, _) = coarse.start_duration(t)?;
        let (fine_start, _) = fine.start_duration(t * ratio)?;
        if coarse_start != fine_start {
            return Err(TsError::IncompatibleHorizons(format!(
                "period {t} starts at {coarse_start} but fine period {} starts at {fine_start}",
                t * ratio
            )));
        }
    }
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_horizon_offsets() {
        let h = SequentialHorizon::new(&[(2, Duration::hours(1)), (1, Duration::hours(22))])
            .unwrap();
        assert_eq!(h.num_periods(), 3);
        assert_eq!(
            h.start_duration(2).unwrap(),
            (Duration::hours(2), Duration::hours(22))
        );
        assert_eq!(h.total_duration(), Duration::hours(24));
        assert!(!h.has_constant_durations());
    }

    #[test]
    fn test_uniform_horizon_has_constant_durations() {
        let h = SequentialHorizon::uniform(4, Duration::hours(6)).unwrap();
        assert!(h.has_constant_durations());
        assert!(matches!(
            h.start_duration(4),
            Err(TsError::PeriodOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_rejects_empty_and_zero_length() {
        assert!(SequentialHorizon::new(&[]).is_err());
        assert!(SequentialHorizon::uniform(0, Duration::hours(1)).is_err());
        assert!(SequentialHorizon::uniform(3, Duration::zero()).is_err());
    }

    #[test]
    fn test_subdivision() {
        let hourly = SequentialHorizon::uniform(24, Duration::hours(1)).unwrap();
        let six_hourly = SequentialHorizon::uniform(4, Duration::hours(6)).unwrap();
        assert_eq!(subdivision(&hourly, &six_hourly).unwrap(), 6);
        assert_eq!(subdivision(&hourly, &hourly).unwrap(), 1);

        let five = SequentialHorizon::uniform(5, Duration::hours(1)).unwrap();
        assert!(subdivision(&hourly, &five).is_err());
    }
}
