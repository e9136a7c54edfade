//! Building blocks shared by the built-in objects: directions, bounds, and
//! the constant/dynamic split of every term they write.

use std::sync::Arc;

use enmod_core::{Attributes, CoreError, CoreResult, Id, ParamRef, Problem};
use enmod_ts::{constant_value, must_dynamic_update, period_value, Horizon, Param, ProbTime};

/// Direction of a term relative to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn parse(value: &Attributes, key: &str) -> CoreResult<Self> {
        match value.text(key)? {
            "In" | "in" => Ok(Direction::In),
            "Out" | "out" => Ok(Direction::Out),
            other => Err(CoreError::structural(format!(
                "{key} must be In or Out, got '{other}'"
            ))),
        }
    }

    /// `+1` into a balance, `-1` out of it.
    pub fn sign(self) -> f64 {
        match self {
            Direction::In => 1.0,
            Direction::Out => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    Upper,
    Lower,
}

impl Bound {
    pub fn parse(value: &Attributes, key: &str) -> CoreResult<Self> {
        match value.text(key)? {
            "Upper" | "upper" => Ok(Bound::Upper),
            "Lower" | "lower" => Ok(Bound::Lower),
            other => Err(CoreError::structural(format!(
                "{key} must be Upper or Lower, got '{other}'"
            ))),
        }
    }
}

/// Which set of terms a protocol call writes.
#[derive(Debug, Clone, Copy)]
pub enum Pass<'a> {
    /// `set_constants`: terms that never change
    Constants,
    /// `update`: terms that depend on the window start
    Update(&'a ProbTime),
}

impl Pass<'_> {
    pub fn writes(&self, dynamic: bool) -> bool {
        match self {
            Pass::Constants => !dynamic,
            Pass::Update(_) => dynamic,
        }
    }

    pub fn eval(&self, param: &dyn Param, horizon: &dyn Horizon, t: usize) -> CoreResult<f64> {
        let value = match self {
            Pass::Constants => constant_value(param, horizon, t)?,
            Pass::Update(start) => period_value(param, horizon, start, t)?,
        };
        Ok(value)
    }
}

/// `scale * factor_1 * factor_2 * ...`, evaluated per period.
#[derive(Debug, Clone)]
pub struct ScaledProduct {
    pub scale: f64,
    pub factors: Vec<Arc<dyn Param>>,
}

impl ScaledProduct {
    pub fn new(scale: f64, factors: Vec<Arc<dyn Param>>) -> Self {
        Self { scale, factors }
    }

    pub fn is_dynamic(&self, horizon: &dyn Horizon) -> bool {
        self.factors
            .iter()
            .any(|factor| must_dynamic_update(factor.as_ref(), horizon))
    }

    pub fn eval(&self, pass: &Pass<'_>, horizon: &dyn Horizon, t: usize) -> CoreResult<f64> {
        let mut value = self.scale;
        for factor in &self.factors {
            value *= pass.eval(factor.as_ref(), horizon, t)?;
        }
        Ok(value)
    }
}

/// Bound on a flow or storage variable, attached by a capacity element.
#[derive(Debug, Clone)]
pub struct Capacity {
    pub id: Id,
    pub param: ParamRef,
    pub bound: Bound,
}

/// Objective contribution attached by a cost element.
#[derive(Debug, Clone)]
pub struct CostTerm {
    pub id: Id,
    pub param: ParamRef,
    pub direction: Direction,
}

impl CostTerm {
    /// Cost (`In`) adds to the objective, revenue (`Out`) subtracts.
    pub fn product(&self) -> ScaledProduct {
        ScaledProduct::new(self.direction.sign(), vec![self.param.param.clone()])
    }
}

/// Capacities and costs of one variable block, kept in `Id` order so the
/// compiled object does not depend on input order.
#[derive(Debug, Clone, Default)]
pub struct VariableTerms {
    pub capacities: Vec<Capacity>,
    pub costs: Vec<CostTerm>,
}

impl VariableTerms {
    pub fn add_capacity(&mut self, capacity: Capacity) {
        let at = self
            .capacities
            .partition_point(|existing| existing.id < capacity.id);
        self.capacities.insert(at, capacity);
    }

    pub fn add_cost(&mut self, cost: CostTerm) {
        let at = self.costs.partition_point(|existing| existing.id < cost.id);
        self.costs.insert(at, cost);
    }

    pub fn has_lower(&self) -> bool {
        self.capacities.iter().any(|c| c.bound == Bound::Lower)
    }

    pub fn references(&self) -> Vec<Id> {
        self.capacities
            .iter()
            .filter_map(|c| c.param.id.clone())
            .chain(self.costs.iter().filter_map(|c| c.param.id.clone()))
            .collect()
    }

    /// Write bounds and objective coefficients of `var` for this pass.
    ///
    /// Several upper capacities combine to their minimum, several lower ones
    /// to their maximum. Without a lower capacity the lower bound is
    /// `default_lb`. `extra` holds objective terms contributed by the owner.
    pub fn write(
        &self,
        problem: &mut dyn Problem,
        var: &Id,
        horizon: &dyn Horizon,
        pass: &Pass<'_>,
        default_lb: f64,
        extra: &[ScaledProduct],
    ) -> CoreResult<()> {
        for bound in [Bound::Upper, Bound::Lower] {
            let caps: Vec<&Capacity> =
                self.capacities.iter().filter(|c| c.bound == bound).collect();
            if caps.is_empty() {
                if bound == Bound::Lower && matches!(pass, Pass::Constants) {
                    for t in 0..horizon.num_periods() {
                        problem.set_lb(var, t, default_lb)?;
                    }
                }
                continue;
            }
            let dynamic = caps
                .iter()
                .any(|c| must_dynamic_update(c.param.param.as_ref(), horizon));
            if !pass.writes(dynamic) {
                continue;
            }
            for t in 0..horizon.num_periods() {
                let mut combined: Option<f64> = None;
                for cap in &caps {
                    let value = pass.eval(cap.param.param.as_ref(), horizon, t)?;
                    combined = Some(match (combined, bound) {
                        (None, _) => value,
                        (Some(current), Bound::Upper) => current.min(value),
                        (Some(current), Bound::Lower) => current.max(value),
                    });
                }
                if let Some(value) = combined {
                    match bound {
                        Bound::Upper => problem.set_ub(var, t, value)?,
                        Bound::Lower => problem.set_lb(var, t, value)?,
                    }
                }
            }
        }

        let products: Vec<ScaledProduct> = self
            .costs
            .iter()
            .map(CostTerm::product)
            .chain(extra.iter().cloned())
            .collect();
        if products.is_empty() {
            return Ok(());
        }
        let dynamic = products.iter().any(|p| p.is_dynamic(horizon));
        if pass.writes(dynamic) {
            for t in 0..horizon.num_periods() {
                let mut total = 0.0;
                for product in &products {
                    total += product.eval(pass, horizon, t)?;
                }
                problem.set_obj_coeff(var, t, total)?;
            }
        }
        Ok(())
    }
}
