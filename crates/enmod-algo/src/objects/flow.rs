//! Flows and the arrows that connect them to balances.

use std::any::Any;
use std::sync::Arc;

use enmod_core::{
    Assemble, AssemblyContext, Attributes, CoreError, CoreResult, Deps, ElementKey, Id, Inclusion,
    ModelObject, ObjectStores, ParamRef, Problem, ProblemParticipant,
};
use enmod_ts::{subdivision, Horizon, ProbTime};

use super::balance::Balance;
use super::terms::{Direction, Pass, ScaledProduct, VariableTerms};
use crate::concepts::{BALANCE, CONVERSION, FLOW, LOSS};
use crate::lowlevel::Loss;

/// Connection of a flow to a balance: one unit of flow moves
/// `conversion * (1 - loss)` units in or out of the balance.
#[derive(Debug, Clone)]
pub struct Arrow {
    pub id: Id,
    pub balance: Id,
    pub conversion: ParamRef,
    pub direction: Direction,
    pub loss: Option<(Id, Loss)>,
}

impl Arrow {
    fn retained(&self) -> f64 {
        self.loss.as_ref().map_or(1.0, |(_, loss)| loss.retained())
    }

    /// Coefficient of the flow in an endogenous balance row.
    fn coefficient(&self) -> ScaledProduct {
        ScaledProduct::new(
            self.direction.sign() * self.retained(),
            vec![self.conversion.param.clone()],
        )
    }

    /// Objective term against an exogenous price: selling (`In`) earns,
    /// buying (`Out`) costs.
    fn market_value(&self, price: &ParamRef) -> ScaledProduct {
        ScaledProduct::new(
            -self.direction.sign() * self.retained(),
            vec![price.param.clone(), self.conversion.param.clone()],
        )
    }
}

/// Derived during assembly, one per arrow in arrow order.
#[derive(Debug, Clone)]
struct ArrowLink {
    /// Flow periods per balance row
    ratio: usize,
    /// Set for arrows into an exogenous balance
    price: Option<ParamRef>,
}

#[derive(Debug, Clone)]
pub struct Flow {
    id: Id,
    arrows: Vec<Arrow>,
    terms: VariableTerms,
    horizon: Option<Arc<dyn Horizon>>,
    links: Vec<ArrowLink>,
}

impl Flow {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            arrows: Vec::new(),
            terms: VariableTerms::default(),
            horizon: None,
            links: Vec::new(),
        }
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn terms(&self) -> &VariableTerms {
        &self.terms
    }

    pub fn terms_mut(&mut self) -> &mut VariableTerms {
        &mut self.terms
    }

    /// Attach an arrow. A flow connects to each balance at most once.
    pub fn add_arrow(&mut self, arrow: Arrow) -> CoreResult<()> {
        if let Some(existing) = self.arrows.iter().find(|a| a.balance == arrow.balance) {
            return Err(CoreError::structural(format!(
                "{} already connects {} to {}",
                existing.id, self.id, arrow.balance
            )));
        }
        let at = self.arrows.partition_point(|existing| existing.id < arrow.id);
        self.arrows.insert(at, arrow);
        Ok(())
    }

    fn assembled_horizon(&self) -> CoreResult<&Arc<dyn Horizon>> {
        self.horizon
            .as_ref()
            .ok_or_else(|| CoreError::structural(format!("no arrows for flow {}", self.id)))
    }

    fn write(&self, problem: &mut dyn Problem, pass: &Pass<'_>) -> CoreResult<()> {
        let horizon = self.assembled_horizon()?.as_ref();
        let mut market = Vec::new();
        for (arrow, link) in self.arrows.iter().zip(&self.links) {
            if let Some(price) = &link.price {
                market.push(arrow.market_value(price));
                continue;
            }
            let coefficient = arrow.coefficient();
            if !pass.writes(coefficient.is_dynamic(horizon)) {
                continue;
            }
            for t in 0..horizon.num_periods() {
                let value = coefficient.eval(pass, horizon, t)?;
                problem.set_con_coeff(&arrow.balance, &self.id, t / link.ratio, t, value)?;
            }
        }
        self.terms.write(problem, &self.id, horizon, pass, 0.0, &market)
    }
}

impl Assemble for Flow {
    /// Model the flow on the finest horizon among its balances.
    fn assemble(&mut self, ctx: &AssemblyContext<'_>) -> CoreResult<bool> {
        if self.arrows.is_empty() {
            return Ok(true);
        }
        let mut balances = Vec::with_capacity(self.arrows.len());
        for arrow in &self.arrows {
            let Some(balance) = ctx.get_as::<Balance>(&arrow.balance) else {
                if ctx.exists(&arrow.balance) {
                    return Ok(false);
                }
                return Err(CoreError::structural(format!(
                    "{} points to {} which is not a balance",
                    arrow.id, arrow.balance
                )));
            };
            balances.push(balance);
        }

        let finest = balances
            .iter()
            .map(|balance| balance.balance_horizon())
            .max_by_key(|horizon| horizon.num_periods())
            .ok_or_else(|| CoreError::structural(format!("no arrows for flow {}", self.id)))?;

        let mut links = Vec::with_capacity(balances.len());
        for balance in balances {
            let ratio = subdivision(finest.as_ref(), balance.balance_horizon().as_ref())?;
            links.push(ArrowLink {
                ratio,
                price: balance.price().cloned(),
            });
        }
        self.horizon = Some(finest);
        self.links = links;
        Ok(true)
    }
}

impl ProblemParticipant for Flow {
    fn build(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        let horizon = self.assembled_horizon()?;
        problem.add_var(&self.id, horizon.num_periods())?;
        Ok(())
    }

    fn set_constants(&self, problem: &mut dyn Problem) -> CoreResult<()> {
        self.write(problem, &Pass::Constants)
    }

    fn update(&self, problem: &mut dyn Problem, start: &ProbTime) -> CoreResult<()> {
        self.write(problem, &Pass::Update(start))
    }
}

impl ModelObject for Flow {
    fn id(&self) -> &Id {
        &self.id
    }

    fn references(&self) -> Vec<Id> {
        let mut refs = Vec::new();
        for arrow in &self.arrows {
            refs.push(arrow.balance.clone());
            refs.extend(arrow.conversion.id.clone());
            refs.extend(arrow.loss.as_ref().map(|(id, _)| id.clone()));
        }
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
    _value: &Attributes,
) -> CoreResult<Inclusion> {
    stores.insert_top(Box::new(Flow::new(key.id())))?;
    Ok(Inclusion::Included(Deps::new()))
}

pub fn include_arrow(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let direction = Direction::parse(value, "Direction")?;
    let flow_id = deps.track(Id::new(FLOW, value.text("Flow")?));
    let balance_id = deps.track(Id::new(BALANCE, value.text("Balance")?));
    let conversion = stores.resolve_param(value, "Conversion", CONVERSION, &mut deps)?;
    let loss = match value.opt_text("Loss")? {
        None => Some(None),
        Some(name) => {
            let loss_id = deps.track(Id::new(LOSS, name));
            stores
                .extension::<Loss>(&loss_id)?
                .map(|loss| Some((loss_id, *loss)))
        }
    };

    let ready = stores.contains_top(&flow_id) && stores.contains_top(&balance_id);
    let (true, Some(conversion), Some(loss)) = (ready, conversion, loss) else {
        return Ok(Inclusion::Deferred(deps));
    };
    if stores.top_as::<Balance>(&balance_id).is_none() {
        return Err(CoreError::structural(format!("{balance_id} is not a balance")));
    }
    let flow = stores
        .top_as_mut::<Flow>(&flow_id)
        .ok_or_else(|| CoreError::structural(format!("{flow_id} is not a flow")))?;
    flow.add_arrow(Arrow {
        id: key.id(),
        balance: balance_id,
        conversion,
        direction,
        loss,
    })?;
    Ok(Inclusion::Included(deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use enmod_ts::{ConstantParam, Duration, SequentialHorizon};

    fn arrow(name: &str, balance: &str, direction: Direction) -> Arrow {
        Arrow {
            id: Id::new("Arrow", name),
            balance: Id::new("Balance", balance),
            conversion: ParamRef {
                id: None,
                param: Arc::new(ConstantParam::new(2.0)),
            },
            direction,
            loss: Some((Id::new("Loss", "l"), Loss::new(0.1, 1.0).unwrap())),
        }
    }

    #[test]
    fn test_coefficient_and_market_value() {
        let horizon = SequentialHorizon::uniform(1, Duration::hours(1)).unwrap();
        let into = arrow("a", "B", Direction::In);
        let out = arrow("b", "C", Direction::Out);
        let c = |p: ScaledProduct| p.eval(&Pass::Constants, &horizon, 0).unwrap();
        assert!((c(into.coefficient()) - 1.8).abs() < 1e-12);
        assert!((c(out.coefficient()) + 1.8).abs() < 1e-12);

        let price = ParamRef {
            id: None,
            param: Arc::new(ConstantParam::new(10.0)),
        };
        assert!((c(into.market_value(&price)) + 18.0).abs() < 1e-12);
        assert!((c(out.market_value(&price)) - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_one_arrow_per_balance() {
        let mut flow = Flow::new(Id::new("Flow", "F"));
        flow.add_arrow(arrow("b", "B", Direction::In)).unwrap();
        flow.add_arrow(arrow("a", "C", Direction::Out)).unwrap();
        let err = flow.add_arrow(arrow("c", "B", Direction::Out)).unwrap_err();
        assert!(err.to_string().contains("Arrow:b already connects Flow:F to Balance:B"));
        let names: Vec<_> = flow.arrows().iter().map(|a| a.id.instance.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_build_without_arrows_fails() {
        let flow = Flow::new(Id::new("Flow", "lonely"));
        let mut lp = crate::problem::LpProblem::new();
        let err = flow.build(&mut lp).unwrap_err();
        assert!(err.to_string().contains("no arrows for flow Flow:lonely"));
    }
}
