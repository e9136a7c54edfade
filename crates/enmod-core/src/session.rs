//! Lifecycle driver for one numeric problem built from compiled objects.
//!
//! ```text
//! Unbuilt --build--> Built --set_constants--> ConstantsSet --update--> Ready
//!                                                              Ready --update--> Ready
//! ```
//!
//! Calls out of this order fail with [`CoreError::Lifecycle`]. The session
//! also carries state variables between windows: incoming variables are
//! fixed to the current state before each solve, and the outgoing values of
//! the solution become the next state. [`ProblemSession::align_states`]
//! moves the outgoing variables to the period that ends where the next
//! window starts.

use std::sync::Arc;

use enmod_ts::{hours, Duration, Horizon, ProbTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::object::StateVariable;
use crate::problem::Problem;
use crate::store::ModelObjects;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Unbuilt,
    Built,
    ConstantsSet,
    Ready,
}

/// Objective of one solved window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub start: ProbTime,
    pub objective: f64,
}

pub struct ProblemSession<'a, P: Problem> {
    objects: &'a ModelObjects,
    problem: P,
    stage: Stage,
    states: Vec<(StateVariable, f64)>,
    /// Horizon of the object owning each state, parallel to `states`
    state_horizons: Vec<Option<Arc<dyn Horizon>>>,
    solved_steps: usize,
}

impl<'a, P: Problem> ProblemSession<'a, P> {
    pub fn new(objects: &'a ModelObjects, problem: P) -> Self {
        Self {
            objects,
            problem,
            stage: Stage::Unbuilt,
            states: Vec::new(),
            state_horizons: Vec::new(),
            solved_steps: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut P {
        &mut self.problem
    }

    pub fn into_problem(self) -> P {
        self.problem
    }

    /// Current value of every state variable.
    pub fn states(&self) -> &[(StateVariable, f64)] {
        &self.states
    }

    fn expect_stage(&self, allowed: &[Stage], operation: &str) -> CoreResult<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(CoreError::Lifecycle(format!(
                "cannot {operation} in stage {:?}",
                self.stage
            )))
        }
    }

    pub fn build(&mut self) -> CoreResult<()> {
        self.expect_stage(&[Stage::Unbuilt], "build")?;
        for (_, object) in self.objects.iter() {
            object.build(&mut self.problem)?;
        }
        self.states.clear();
        self.state_horizons.clear();
        for (_, object) in self.objects.iter() {
            for state in object.state_variables() {
                let initial = state.initial;
                self.states.push((state, initial));
                self.state_horizons.push(object.horizon());
            }
        }
        self.stage = Stage::Built;
        debug!(states = self.states.len(), "problem built");
        Ok(())
    }

    pub fn set_constants(&mut self) -> CoreResult<()> {
        self.expect_stage(&[Stage::Built], "set constants")?;
        for (_, object) in self.objects.iter() {
            object.set_constants(&mut self.problem)?;
        }
        self.stage = Stage::ConstantsSet;
        Ok(())
    }

    /// Refresh time-dependent terms for the window starting at `start` and
    /// fix incoming state variables.
    pub fn update(&mut self, start: &ProbTime) -> CoreResult<()> {
        self.expect_stage(&[Stage::ConstantsSet, Stage::Ready], "update")?;
        for (_, object) in self.objects.iter() {
            object.update(&mut self.problem, start)?;
        }
        for (state, value) in &self.states {
            self.problem
                .fix(&state.incoming.id, state.incoming.period, *value)?;
        }
        self.stage = Stage::Ready;
        Ok(())
    }

    /// Solve the current window and carry state forward.
    pub fn solve(&mut self) -> CoreResult<f64> {
        self.expect_stage(&[Stage::Ready], "solve")?;
        self.problem.solve()?;
        for (state, value) in &mut self.states {
            *value = self
                .problem
                .var_value(&state.outgoing.id, state.outgoing.period)?;
        }
        self.solved_steps += 1;
        Ok(self.problem.objective_value()?)
    }

    /// Carry each state out of the period that ends `step_length` after the
    /// window start, so the next window continues where this one left off.
    ///
    /// Fails when a stateful object has no period ending exactly there.
    pub fn align_states(&mut self, step_length: Duration) -> CoreResult<()> {
        self.expect_stage(
            &[Stage::Built, Stage::ConstantsSet, Stage::Ready],
            "align states",
        )?;
        for ((state, _), horizon) in self.states.iter_mut().zip(&self.state_horizons) {
            let owner = &state.outgoing.id;
            let horizon = horizon.as_ref().ok_or_else(|| {
                CoreError::structural(format!("{owner} carries state but has no horizon"))
            })?;
            let mut period = None;
            for t in 0..horizon.num_periods() {
                let (offset, duration) = horizon.start_duration(t)?;
                if offset + duration == step_length {
                    period = Some(t);
                    break;
                }
            }
            state.outgoing.period = period.ok_or_else(|| {
                CoreError::structural(format!(
                    "a step of {}h does not end a period of {owner}",
                    hours(step_length)
                ))
            })?;
        }
        Ok(())
    }

    /// `update` followed by `solve`.
    pub fn step(&mut self, start: &ProbTime) -> CoreResult<StepResult> {
        self.update(start)?;
        let objective = self.solve()?;
        Ok(StepResult {
            step: self.solved_steps,
            start: *start,
            objective,
        })
    }

    /// Build, set constants, then solve `steps` windows starting at `start`,
    /// each shifted by `step_length` from the previous one. States are
    /// aligned to `step_length` first.
    pub fn run(
        &mut self,
        start: ProbTime,
        step_length: Duration,
        steps: usize,
    ) -> CoreResult<Vec<StepResult>> {
        if self.stage == Stage::Unbuilt {
            self.build()?;
        }
        if self.stage == Stage::Built {
            self.set_constants()?;
        }
        self.align_states(step_length)?;
        let mut results = Vec::with_capacity(steps);
        let mut now = start;
        for _ in 0..steps {
            let result = self.step(&now)?;
            debug!(
                step = result.step,
                objective = result.objective,
                start = %now,
                "solved window"
            );
            results.push(result);
            now = now.shifted(step_length);
        }
        info!(steps, "rolling horizon finished");
        Ok(results)
    }
}
