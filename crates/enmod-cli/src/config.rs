//! Run configuration for `enmod run`.
//!
//! Read from an optional TOML file. Unspecified keys keep their defaults,
//! and command-line flags override both.
//!
//! ```toml
//! start = "2025-01-01T00:00:00"
//! step_hours = 24.0
//! steps = 7
//! validate = true
//!
//! [solver]
//! silent = true
//! warm_start = false
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use enmod_ts::{from_hours, parse_datetime, reference_time, Duration, ProbTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Start of the first window; the reference time when unset.
    pub start: Option<NaiveDateTime>,
    /// Start of the scenario clock when it differs from the data clock.
    pub scenario_start: Option<NaiveDateTime>,
    pub step_hours: f64,
    pub steps: usize,
    /// Check references after compiling.
    pub validate: bool,
    pub solver: SolverConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start: None,
            scenario_start: None,
            step_hours: 24.0,
            steps: 1,
            validate: true,
            solver: SolverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub silent: bool,
    pub warm_start: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            silent: true,
            warm_start: false,
        }
    }
}

impl RunConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading run config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing run config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        steps: Option<usize>,
        step_hours: Option<f64>,
        start: Option<&str>,
    ) -> Result<Self> {
        if let Some(steps) = steps {
            self.steps = steps;
        }
        if let Some(hours) = step_hours {
            self.step_hours = hours;
        }
        if let Some(stamp) = start {
            self.start = Some(parse_datetime(stamp)?);
        }
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> Result<()> {
        if self.steps == 0 {
            bail!("steps must be at least 1");
        }
        if !(self.step_hours.is_finite() && self.step_hours > 0.0) {
            bail!("step_hours must be positive, got {}", self.step_hours);
        }
        if self.scenario_start.is_some() && self.start.is_none() {
            bail!("scenario_start requires start");
        }
        Ok(())
    }

    pub fn start_time(&self) -> ProbTime {
        match (self.start, self.scenario_start) {
            (Some(data), Some(scenario)) => ProbTime::new(data, scenario),
            (Some(data), None) => ProbTime::single(data),
            _ => reference_time(),
        }
    }

    pub fn step_length(&self) -> Duration {
        from_hours(self.step_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RunConfig::parse("steps = 4\n[solver]\nwarm_start = true\n").unwrap();
        assert_eq!(config.steps, 4);
        assert_eq!(config.step_hours, 24.0);
        assert!(config.validate);
        assert!(config.solver.silent);
        assert!(config.solver.warm_start);
        assert_eq!(config.start_time(), reference_time());
    }

    #[test]
    fn test_flags_override_file() {
        let file = "start = \"2025-01-01T00:00:00\"\nsteps = 2\nstep_hours = 6.0\n";
        let config = RunConfig::parse(file)
            .unwrap()
            .with_overrides(Some(3), None, Some("2025-02-01T06:00:00"))
            .unwrap();
        assert_eq!(config.steps, 3);
        assert_eq!(config.step_length(), Duration::hours(6));
        assert_eq!(
            config.start_time(),
            ProbTime::single(parse_datetime("2025-02-01T06:00:00").unwrap())
        );
    }

    #[test]
    fn test_separate_scenario_clock() {
        let config = RunConfig::parse(
            "start = \"2030-01-01T00:00:00\"\nscenario_start = \"1995-01-01T00:00:00\"\n",
        )
        .unwrap();
        let start = config.start_time();
        assert_ne!(start.data_time, start.scenario_time);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(RunConfig::parse("steps = 0").is_err());
        assert!(RunConfig::parse("step_hours = -1.0").is_err());
        assert!(RunConfig::parse("stepz = 2").is_err());
        assert!(RunConfig::default()
            .with_overrides(None, None, Some("yesterday"))
            .is_err());
    }
}
