//! Capacity and cost elements. Both attach a term to an existing flow or
//! storage named by `WhichConcept` and `WhichInstance`.

use enmod_core::{Attributes, CoreError, CoreResult, Deps, ElementKey, Id, Inclusion, ObjectStores};

use super::flow::Flow;
use super::storage::Storage;
use super::terms::{Bound, Capacity, CostTerm, Direction, VariableTerms};
use crate::concepts::{FLOW, PARAM, STORAGE};

pub(crate) fn target(value: &Attributes) -> CoreResult<Id> {
    let concept = value.text("WhichConcept")?;
    if concept != FLOW && concept != STORAGE {
        return Err(CoreError::structural(format!(
            "WhichConcept must be {FLOW} or {STORAGE}, got '{concept}'"
        )));
    }
    Ok(Id::new(concept, value.text("WhichInstance")?))
}

fn terms_mut<'a>(stores: &'a mut ObjectStores, target: &Id) -> CoreResult<&'a mut VariableTerms> {
    let terms = if target.concept == FLOW {
        stores.top_as_mut::<Flow>(target).map(Flow::terms_mut)
    } else {
        stores.top_as_mut::<Storage>(target).map(Storage::terms_mut)
    };
    terms.ok_or_else(|| CoreError::structural(format!("{target} cannot take capacities or costs")))
}

pub fn include_capacity(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let bound = Bound::parse(value, "Bound")?;
    let target = deps.track(target(value)?);
    let param = stores.resolve_param(value, "Param", PARAM, &mut deps)?;
    let (true, Some(param)) = (stores.contains_top(&target), param) else {
        return Ok(Inclusion::Deferred(deps));
    };
    terms_mut(stores, &target)?.add_capacity(Capacity {
        id: key.id(),
        param,
        bound,
    });
    Ok(Inclusion::Included(deps))
}

pub fn include_cost(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let direction = Direction::parse(value, "Direction")?;
    let target = deps.track(target(value)?);
    let param = stores.resolve_param(value, "Param", PARAM, &mut deps)?;
    let (true, Some(param)) = (stores.contains_top(&target), param) else {
        return Ok(Inclusion::Deferred(deps));
    };
    terms_mut(stores, &target)?.add_cost(CostTerm {
        id: key.id(),
        param,
        direction,
    });
    Ok(Inclusion::Included(deps))
}
