//! Storages: a level per balance period, carried between windows through a
//! start-state variable.

use std::any::Any;
use std::sync::Arc;

use enmod_core::{
    Assemble, AssemblyContext, Attributes, CoreError, CoreResult, Deps, ElementKey, Id, Inclusion,
    ModelObject, ObjectStores, Problem, ProblemParticipant, StateVariable, VarRef,
};
use enmod_ts::{Horizon, ProbTime};

use super::balance::Balance;
use super::terms::{Pass, VariableTerms};
use crate::concepts::{BALANCE, START_EQUAL_STOP, STORAGE, STORAGE_START};

#[derive(Debug, Clone)]
pub struct Storage {
    id: Id,
    balance: Id,
    initial_level: f64,
    terms: VariableTerms,
    start_equal_stop: bool,
    horizon: Option<Arc<dyn Horizon>>,
}

impl Storage {
    pub fn new(id: Id, balance: Id, initial_level: f64) -> Self {
        Self {
            id,
            balance,
            initial_level,
            terms: VariableTerms::default(),
            start_equal_stop: false,
            horizon: None,
        }
    }

    pub fn balance(&self) -> &Id {
        &self.balance
    }

    pub fn terms(&self) -> &VariableTerms {
        &self.terms
    }

    pub fn terms_mut(&mut self) -> &mut VariableTerms {
        &mut self.terms
    }

    pub fn start_equal_stop(&self) -> bool {
        self.start_equal_stop
    }

    /// End level must return to the start level within every window.
    pub fn set_start_equal_stop(&mut self) {
        self.start_equal_stop = true;
    }

    /// Level at the start of the window, one period.
    pub fn start_id(&self) -> Id {
        Id::new(STORAGE_START, self.id.instance.as_str())
    }

    pub fn boundary_id(&self) -> Id {
        Id::new(START_EQUAL_STOP, self.id.instance.as_str())
    }

    fn assembled_horizon(&self) -> CoreResult<&Arc<dyn Horizon>> {
        self.horizon
            .as_ref()
            .ok_or_else(|| CoreError::structural(format!("{} has not been assembled", self.id)))
    }
}

impl Assemble for Storage {
    fn assemble(&mut self, ctx: &AssemblyContext<'_>) -> CoreResult<bool> {
        let Some(balance) = ctx.get_as::<Balance>(&self.balance) else {
            return Ok(false);
        };
        self.horizon = Some(balance.balance_horizon());
        Ok(true)
    }
}

impl ProblemParticipant for Storage {
    fn build(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        let periods = self.assembled_horizon()?.num_periods();
        problem.add_var(&self.id, periods)?;
        problem.add_var(&self.start_id(), 1)?;
        if self.start_equal_stop {
            problem.add_eq(&self.boundary_id(), 1)?;
        }
        Ok(())
    }

    /// Balance row `t` gets `-level[t] + level[t-1]`, with the start state
    /// standing in for `level[-1]`.
    fn set_constants(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        let horizon = self.assembled_horizon()?.as_ref();
        let periods = horizon.num_periods();
        let start = self.start_id();
        for t in 0..periods {
            problem.set_con_coeff(&self.balance, &self.id, t, t, -1.0)?;
            if t > 0 {
                problem.set_con_coeff(&self.balance, &self.id, t, t - 1, 1.0)?;
            }
        }
        problem.set_con_coeff(&self.balance, &start, 0, 0, 1.0)?;
        if self.start_equal_stop {
            let boundary = self.boundary_id();
            problem.set_con_coeff(&boundary, &start, 0, 0, 1.0)?;
            problem.set_con_coeff(&boundary, &self.id, 0, periods - 1, -1.0)?;
        }
        self.terms
            .write(problem, &self.id, horizon, &Pass::Constants, 0.0, &[])
    }

    fn update(&self, problem: &mut dyn Problem, start: &ProbTime) -> CoreResult<()> {
        let horizon = self.assembled_horizon()?.as_ref();
        self.terms
            .write(problem, &self.id, horizon, &Pass::Update(start), 0.0, &[])
    }

    /// Period 0 is carried unless the session aligns states to a longer step.
    fn state_variables(&self) -> Vec<StateVariable> {
        if self.start_equal_stop {
            return Vec::new();
        }
        vec![StateVariable {
            incoming: VarRef::new(self.start_id(), 0),
            outgoing: VarRef::new(self.id.clone(), 0),
            initial: self.initial_level,
        }]
    }
}

impl ModelObject for Storage {
    fn id(&self) -> &Id {
        &self.id
    }

    fn references(&self) -> Vec<Id> {
        let mut refs = vec![self.balance.clone()];
        refs.extend(self.terms.references());
        refs
    }

    fn horizon(&self) -> Option<Arc<dyn Horizon>> {
        self.horizon.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn include_base(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let initial_level = value.opt_number("InitialLevel")?.unwrap_or(0.0);
    let balance_id = deps.track(Id::new(BALANCE, value.text("Balance")?));
    let Some(balance) = stores.top_as::<Balance>(&balance_id) else {
        if stores.contains_top(&balance_id) {
            return Err(CoreError::structural(format!("{balance_id} is not a balance")));
        }
        return Ok(Inclusion::Deferred(deps));
    };
    if balance.is_exogenous() {
        return Err(CoreError::structural(format!(
            "storage needs an endogenous balance but {balance_id} is exogenous"
        )));
    }
    stores.insert_top(Box::new(Storage::new(key.id(), balance_id, initial_level)))?;
    Ok(Inclusion::Included(deps))
}

/// `StartEqualStop` boundary condition on a storage.
pub fn include_start_equal_stop(
    stores: &mut ObjectStores,
    _key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let concept = value.text("WhichConcept")?;
    if concept != STORAGE {
        return Err(CoreError::structural(format!(
            "StartEqualStop applies to {STORAGE}, not {concept}"
        )));
    }
    let target = deps.track(Id::new(STORAGE, value.text("WhichInstance")?));
    if !stores.contains_top(&target) {
        return Ok(Inclusion::Deferred(deps));
    }
    let storage = stores
        .top_as_mut::<Storage>(&target)
        .ok_or_else(|| CoreError::structural(format!("{target} is not a storage")))?;
    storage.set_start_equal_stop();
    Ok(Inclusion::Included(deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowlevel::Commodity;
    use crate::problem::LpProblem;
    use enmod_ts::{Duration, SequentialHorizon};
    use std::collections::{BTreeMap, BTreeSet};

    fn assembled(cyclic: bool) -> Storage {
        let commodity = Arc::new(Commodity {
            name: "Water".into(),
            horizon_id: Id::new("Horizon", "h"),
            horizon: Arc::new(SequentialHorizon::uniform(3, Duration::hours(24)).unwrap()),
        });
        let balance = Balance::endogenous(
            Id::new("Balance", "reservoir"),
            Id::new("Commodity", "Water"),
            commodity,
        );
        let mut objects: BTreeMap<Id, Box<dyn ModelObject>> = BTreeMap::new();
        objects.insert(balance.id().clone(), Box::new(balance));
        let assembled: BTreeSet<Id> = objects.keys().cloned().collect();

        let mut storage =
            Storage::new(Id::new("Storage", "lake"), Id::new("Balance", "reservoir"), 50.0);
        if cyclic {
            storage.set_start_equal_stop();
        }
        assert!(storage.assemble(&AssemblyContext::new(&objects, &assembled)).unwrap());
        storage
    }

    #[test]
    fn test_waits_for_balance() {
        let objects = BTreeMap::new();
        let assembled = BTreeSet::new();
        let mut storage =
            Storage::new(Id::new("Storage", "lake"), Id::new("Balance", "reservoir"), 0.0);
        assert!(!storage.assemble(&AssemblyContext::new(&objects, &assembled)).unwrap());
    }

    #[test]
    fn test_level_chain_in_balance_rows() {
        let storage = assembled(false);
        let mut lp = LpProblem::new();
        lp.add_eq(&Id::new("Balance", "reservoir"), 3).unwrap();
        storage.build(&mut lp).unwrap();
        storage.set_constants(&mut lp).unwrap();

        let balance = Id::new("Balance", "reservoir");
        let level = Id::new("Storage", "lake");
        assert_eq!(lp.get_con_coeff(&balance, &level, 2, 2).unwrap(), -1.0);
        assert_eq!(lp.get_con_coeff(&balance, &level, 2, 1).unwrap(), 1.0);
        assert_eq!(lp.get_con_coeff(&balance, &level, 2, 0).unwrap(), 0.0);
        let start = Id::new("StorageStart", "lake");
        assert_eq!(lp.get_con_coeff(&balance, &start, 0, 0).unwrap(), 1.0);
        assert_eq!(lp.get_lb(&level, 1).unwrap(), 0.0);

        let states = storage.state_variables();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].initial, 50.0);
        assert_eq!(states[0].incoming.id, Id::new("StorageStart", "lake"));
    }

    #[test]
    fn test_start_equal_stop_replaces_state() {
        let storage = assembled(true);
        let mut lp = LpProblem::new();
        lp.add_eq(&Id::new("Balance", "reservoir"), 3).unwrap();
        storage.build(&mut lp).unwrap();
        storage.set_constants(&mut lp).unwrap();
        let boundary = Id::new("StartEqualStop", "lake");
        assert!(lp.has_con(&boundary));
        assert_eq!(lp.get_con_coeff(&boundary, &Id::new("Storage", "lake"), 0, 2).unwrap(), -1.0);
        assert!(storage.state_variables().is_empty());
    }
}
