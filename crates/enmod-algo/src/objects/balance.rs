//! Balances: one equality row per period that sums everything flowing into
//! and out of a commodity node, or an exogenous market with a given price.

use std::any::Any;
use std::sync::Arc;

use enmod_core::{
    Assemble, AssemblyContext, Attributes, CoreError, CoreResult, Deps, ElementKey, Id, Inclusion,
    ModelObject, ObjectStores, ParamRef, Problem, ProblemParticipant,
};
use enmod_ts::{Horizon, ProbTime};

use super::terms::{Direction, Pass, ScaledProduct};
use crate::concepts::{BALANCE, COMMODITY, FLOW, PARAM, PRICE, SLACK_PREFIX};
use crate::lowlevel::Commodity;

/// Demand (`Out`) or supply (`In`) written to the right-hand side.
#[derive(Debug, Clone)]
pub struct RhsTerm {
    pub id: Id,
    pub param: ParamRef,
    pub direction: Direction,
}

impl RhsTerm {
    fn product(&self) -> ScaledProduct {
        ScaledProduct::new(-self.direction.sign(), vec![self.param.param.clone()])
    }
}

#[derive(Debug, Clone)]
pub enum BalanceKind {
    Endogenous { slack: bool },
    Exogenous { price: ParamRef },
}

#[derive(Debug, Clone)]
pub struct Balance {
    id: Id,
    commodity_id: Id,
    commodity: Arc<Commodity>,
    kind: BalanceKind,
    rhs_terms: Vec<RhsTerm>,
}

impl Balance {
    pub fn endogenous(id: Id, commodity_id: Id, commodity: Arc<Commodity>) -> Self {
        let slack = commodity.is_power();
        Self {
            id,
            commodity_id,
            commodity,
            kind: BalanceKind::Endogenous { slack },
            rhs_terms: Vec::new(),
        }
    }

    pub fn exogenous(id: Id, commodity_id: Id, commodity: Arc<Commodity>, price: ParamRef) -> Self {
        Self {
            id,
            commodity_id,
            commodity,
            kind: BalanceKind::Exogenous { price },
            rhs_terms: Vec::new(),
        }
    }

    pub fn kind(&self) -> &BalanceKind {
        &self.kind
    }

    pub fn is_exogenous(&self) -> bool {
        matches!(self.kind, BalanceKind::Exogenous { .. })
    }

    pub fn price(&self) -> Option<&ParamRef> {
        match &self.kind {
            BalanceKind::Exogenous { price } => Some(price),
            BalanceKind::Endogenous { .. } => None,
        }
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    pub fn balance_horizon(&self) -> Arc<dyn Horizon> {
        self.commodity.horizon.clone()
    }

    pub fn rhs_terms(&self) -> &[RhsTerm] {
        &self.rhs_terms
    }

    /// Variable id of the slack flow, for balances that have one.
    pub fn slack_id(&self) -> Option<Id> {
        match self.kind {
            BalanceKind::Endogenous { slack: true } => Some(Id::new(
                FLOW,
                format!("{SLACK_PREFIX}{}", self.id.instance),
            )),
            _ => None,
        }
    }

    pub fn add_rhs_term(&mut self, term: RhsTerm) -> CoreResult<()> {
        if self.is_exogenous() {
            return Err(CoreError::structural(format!(
                "{} is exogenous and cannot take right-hand-side term {}",
                self.id, term.id
            )));
        }
        let at = self.rhs_terms.partition_point(|existing| existing.id < term.id);
        self.rhs_terms.insert(at, term);
        Ok(())
    }

    fn write_rhs(&self, problem: &mut dyn Problem, pass: &Pass<'_>) -> CoreResult<()> {
        let horizon = self.commodity.horizon.as_ref();
        for term in &self.rhs_terms {
            let product = term.product();
            if !pass.writes(product.is_dynamic(horizon)) {
                continue;
            }
            for t in 0..horizon.num_periods() {
                let value = product.eval(pass, horizon, t)?;
                problem.set_rhs_term(&self.id, &term.id, t, value)?;
            }
        }
        Ok(())
    }
}

impl Assemble for Balance {
    fn assemble(&mut self, _ctx: &AssemblyContext<'_>) -> CoreResult<bool> {
        Ok(true)
    }
}

impl ProblemParticipant for Balance {
    fn build(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        if self.is_exogenous() {
            return Ok(());
        }
        let periods = self.commodity.horizon.num_periods();
        problem.add_eq(&self.id, periods)?;
        if let Some(slack) = self.slack_id() {
            problem.add_var(&slack, periods)?;
        }
        Ok(())
    }

    fn set_constants(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        if let Some(slack) = self.slack_id() {
            for t in 0..self.commodity.horizon.num_periods() {
                problem.set_con_coeff(&self.id, &slack, t, t, -1.0)?;
                problem.set_lb(&slack, t, 0.0)?;
            }
        }
        self.write_rhs(problem, &Pass::Constants)
    }

    fn update(&self, problem: &mut dyn Problem, start: &ProbTime) -> CoreResult<()> {
        self.write_rhs(problem, &Pass::Update(start))
    }
}

impl ModelObject for Balance {
    fn id(&self) -> &Id {
        &self.id
    }

    fn references(&self) -> Vec<Id> {
        let mut refs = vec![self.commodity_id.clone()];
        if let Some(id) = self.price().and_then(|price| price.id.clone()) {
            refs.push(id);
        }
        refs.extend(self.rhs_terms.iter().filter_map(|term| term.param.id.clone()));
        refs
    }

    fn horizon(&self) -> Option<Arc<dyn Horizon>> {
        Some(self.balance_horizon())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn commodity(
    stores: &ObjectStores,
    value: &Attributes,
    deps: &mut Deps,
) -> CoreResult<Option<(Id, Arc<Commodity>)>> {
    let id = deps.track(Id::new(COMMODITY, value.text("Commodity")?));
    Ok(stores.extension::<Commodity>(&id)?.map(|commodity| (id, commodity)))
}

pub fn include_base(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let Some((commodity_id, commodity)) = commodity(stores, value, &mut deps)? else {
        return Ok(Inclusion::Deferred(deps));
    };
    stores.insert_top(Box::new(Balance::endogenous(key.id(), commodity_id, commodity)))?;
    Ok(Inclusion::Included(deps))
}

/// The price is either `Price` (a number or a `Price` element) or
/// `PriceParam` (a number or a `Param` element), never both.
pub fn include_exogen(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let commodity = commodity(stores, value, &mut deps)?;

    let price = match (value.contains("Price"), value.contains("PriceParam")) {
        (true, false) => stores.resolve_param(value, "Price", PRICE, &mut deps)?,
        (false, true) => stores.resolve_param(value, "PriceParam", PARAM, &mut deps)?,
        (true, true) => {
            return Err(CoreError::structural(
                "exogenous balance takes Price or PriceParam, not both",
            ))
        }
        (false, false) => {
            return Err(CoreError::structural(
                "exogenous balance needs a Price or a PriceParam",
            ))
        }
    };

    let (Some((commodity_id, commodity)), Some(price)) = (commodity, price) else {
        return Ok(Inclusion::Deferred(deps));
    };
    stores.insert_top(Box::new(Balance::exogenous(key.id(), commodity_id, commodity, price)))?;
    Ok(Inclusion::Included(deps))
}

pub fn include_rhs_term(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let direction = Direction::parse(value, "Direction")?;
    let balance_id = deps.track(Id::new(BALANCE, value.text("Balance")?));
    let param = stores.resolve_param(value, "Param", PARAM, &mut deps)?;
    let (true, Some(param)) = (stores.contains_top(&balance_id), param) else {
        return Ok(Inclusion::Deferred(deps));
    };
    let balance = stores
        .top_as_mut::<Balance>(&balance_id)
        .ok_or_else(|| CoreError::structural(format!("{balance_id} is not a balance")))?;
    balance.add_rhs_term(RhsTerm {
        id: key.id(),
        param,
        direction,
    })?;
    Ok(Inclusion::Included(deps))
}
