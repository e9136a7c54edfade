//! The default registry of built-in element types.

use enmod_core::{
    AttrValue, Attributes, CoreResult, ElementKey, Id, IncludeHandler, Inclusion, ObjectStores,
    TypeRegistry,
};

use crate::checks;
use crate::concepts::*;
use crate::lowlevel;
use crate::objects::{attach, balance, flow, storage};

type IncludeFn = fn(&mut ObjectStores, &ElementKey, &Attributes) -> CoreResult<Inclusion>;
type ReferencesFn = fn(&Attributes) -> Vec<Id>;

/// A built-in handler: the inclusion function plus the references that can
/// be read off the attributes for dataset checks.
#[derive(Clone, Copy)]
pub struct Builtin {
    include: IncludeFn,
    references: ReferencesFn,
}

impl Builtin {
    pub fn new(include: IncludeFn, references: ReferencesFn) -> Self {
        Self { include, references }
    }
}

impl IncludeHandler for Builtin {
    fn include(
        &self,
        stores: &mut ObjectStores,
        key: &ElementKey,
        value: &Attributes,
    ) -> CoreResult<Inclusion> {
        (self.include)(stores, key, value)
    }

    fn references(&self, _key: &ElementKey, value: &Attributes) -> Vec<Id> {
        (self.references)(value)
    }
}

/// `Id(concept, name)` when `key` holds a name rather than a number.
fn text_ref(value: &Attributes, key: &str, concept: &str) -> Option<Id> {
    match value.get(key) {
        Ok(AttrValue::Text(name)) => Some(Id::new(concept, name.as_str())),
        _ => None,
    }
}

fn no_refs(_value: &Attributes) -> Vec<Id> {
    Vec::new()
}

fn series_refs(value: &Attributes) -> Vec<Id> {
    ["Level", "Profile"]
        .into_iter()
        .filter_map(|key| text_ref(value, key, TIME_VECTOR))
        .collect()
}

fn param_ref(value: &Attributes) -> Vec<Id> {
    text_ref(value, "Param", PARAM).into_iter().collect()
}

fn commodity_refs(value: &Attributes) -> Vec<Id> {
    text_ref(value, "Horizon", HORIZON).into_iter().collect()
}

fn balance_refs(value: &Attributes) -> Vec<Id> {
    text_ref(value, "Commodity", COMMODITY).into_iter().collect()
}

fn exogen_refs(value: &Attributes) -> Vec<Id> {
    [
        text_ref(value, "Commodity", COMMODITY),
        text_ref(value, "Price", PRICE),
        text_ref(value, "PriceParam", PARAM),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn arrow_refs(value: &Attributes) -> Vec<Id> {
    [
        text_ref(value, "Flow", FLOW),
        text_ref(value, "Balance", BALANCE),
        text_ref(value, "Conversion", CONVERSION),
        text_ref(value, "Loss", LOSS),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn attached_refs(value: &Attributes) -> Vec<Id> {
    attach::target(value)
        .ok()
        .into_iter()
        .chain(text_ref(value, "Param", PARAM))
        .collect()
}

fn rhs_refs(value: &Attributes) -> Vec<Id> {
    [text_ref(value, "Balance", BALANCE), text_ref(value, "Param", PARAM)]
        .into_iter()
        .flatten()
        .collect()
}

fn storage_refs(value: &Attributes) -> Vec<Id> {
    text_ref(value, "Balance", BALANCE).into_iter().collect()
}

fn boundary_refs(value: &Attributes) -> Vec<Id> {
    text_ref(value, "WhichInstance", STORAGE).into_iter().collect()
}

/// Registry with every built-in `(concept, type)` pair.
pub fn default_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    let entries: [(&str, &str, IncludeFn, ReferencesFn); 20] = [
        (TIME_VECTOR, types::CONSTANT_TIME_VECTOR, lowlevel::timevector::include_constant, no_refs),
        (TIME_VECTOR, types::INFINITE_TIME_VECTOR, lowlevel::timevector::include_infinite, no_refs),
        (TIME_VECTOR, types::ROTATING_TIME_VECTOR, lowlevel::timevector::include_rotating, no_refs),
        (HORIZON, types::SEQUENTIAL_HORIZON, lowlevel::horizon::include_sequential, no_refs),
        (PARAM, types::CONSTANT_PARAM, lowlevel::param::include_constant, no_refs),
        (PARAM, types::MEAN_SERIES_PARAM, lowlevel::param::include_mean_series, series_refs),
        (PARAM, types::MW_TO_GWH_SERIES_PARAM, lowlevel::param::include_mw_to_gwh, series_refs),
        (COMMODITY, types::BASE_COMMODITY, lowlevel::commodity::include_base, commodity_refs),
        (CONVERSION, types::BASE_CONVERSION, lowlevel::param::include_alias, param_ref),
        (LOSS, types::SIMPLE_LOSS, lowlevel::loss::include_simple, no_refs),
        (PRICE, types::BASE_PRICE, lowlevel::param::include_alias, param_ref),
        (BALANCE, types::BASE_BALANCE, balance::include_base, balance_refs),
        (BALANCE, types::EXOGEN_BALANCE, balance::include_exogen, exogen_refs),
        (FLOW, types::BASE_FLOW, flow::include_base, no_refs),
        (STORAGE, types::BASE_STORAGE, storage::include_base, storage_refs),
        (ARROW, types::BASE_ARROW, flow::include_arrow, arrow_refs),
        (CAPACITY, types::POSITIVE_CAPACITY, attach::include_capacity, attached_refs),
        (COST, types::COST_TERM, attach::include_cost, attached_refs),
        (RHS_TERM, types::BASE_RHS_TERM, balance::include_rhs_term, rhs_refs),
        (
            BOUNDARY_CONDITION,
            types::START_EQUAL_STOP,
            storage::include_start_equal_stop,
            boundary_refs,
        ),
    ];
    for (concept, type_name, include, references) in entries {
        registry.register(concept, type_name, Builtin::new(include, references));
    }
    registry.add_object_check(checks::unconnected_balances);
    registry
}
