//! Params, and the concepts that are a param under another name
//! (conversions and prices).

use std::sync::Arc;

use enmod_core::{Attributes, CoreResult, Deps, ElementKey, Inclusion, LowLevelObject, ObjectStores};
use enmod_ts::{ConstantParam, MWToGWhSeriesParam, MeanSeriesParam, Param, TimeVector};

use super::resolve_time_vector;
use crate::concepts::PARAM;

pub fn include_constant(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let param = ConstantParam::new(value.number("Value")?);
    stores.insert_low(key.id(), LowLevelObject::Param(Arc::new(param)))?;
    Ok(Inclusion::Included(Deps::new()))
}

type SeriesCtor = fn(Arc<dyn TimeVector>, Arc<dyn TimeVector>) -> Arc<dyn Param>;

fn mean_series(level: Arc<dyn TimeVector>, profile: Arc<dyn TimeVector>) -> Arc<dyn Param> {
    Arc::new(MeanSeriesParam::new(level, profile))
}

fn mw_to_gwh(level: Arc<dyn TimeVector>, profile: Arc<dyn TimeVector>) -> Arc<dyn Param> {
    Arc::new(MWToGWhSeriesParam::new(level, profile))
}

fn include_series(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
    ctor: SeriesCtor,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let level = resolve_time_vector(stores, value, "Level", &mut deps)?;
    let profile = resolve_time_vector(stores, value, "Profile", &mut deps)?;
    let (Some(level), Some(profile)) = (level, profile) else {
        return Ok(Inclusion::Deferred(deps));
    };
    stores.insert_low(key.id(), LowLevelObject::Param(ctor(level, profile)))?;
    Ok(Inclusion::Included(deps))
}

/// Level at data time times profile at scenario time.
pub fn include_mean_series(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    include_series(stores, key, value, mean_series)
}

/// Mean series in MW turned into GWh per period.
pub fn include_mw_to_gwh(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    include_series(stores, key, value, mw_to_gwh)
}

/// Store the param named by `Param` (or an inline number) under the
/// element's own identity. Used for conversions and prices.
pub fn include_alias(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let Some(param) = stores.resolve_param(value, "Param", PARAM, &mut deps)? else {
        return Ok(Inclusion::Deferred(deps));
    };
    stores.insert_low(key.id(), LowLevelObject::Param(param.param))?;
    Ok(Inclusion::Included(deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use enmod_core::Id;
    use enmod_ts::{parse_datetime, Duration, ProbTime};

    #[test]
    fn test_series_waits_for_time_vectors() {
        let mut stores = ObjectStores::new();
        let key = ElementKey::new("Param", "MWToGWhSeriesParam", "demand");
        let attrs = Attributes::new().with("Level", "cap").with("Profile", 1.0);

        let first = include_mw_to_gwh(&mut stores, &key, &attrs).unwrap();
        assert!(!first.is_included());
        assert_eq!(first.deps().ids, vec![Id::new("TimeVector", "cap")]);

        crate::lowlevel::timevector::include_constant(
            &mut stores,
            &ElementKey::new("TimeVector", "ConstantTimeVector", "cap"),
            &Attributes::new().with("Value", 500.0),
        )
        .unwrap();
        assert!(include_mw_to_gwh(&mut stores, &key, &attrs).unwrap().is_included());

        let param = stores.param(&Id::new("Param", "demand")).unwrap().unwrap();
        assert!(param.is_durational());
        let start = ProbTime::single(parse_datetime("2025-01-01").unwrap());
        assert_eq!(param.value(&start, Duration::hours(4)), 2.0);
    }

    #[test]
    fn test_alias_accepts_inline_number() {
        let mut stores = ObjectStores::new();
        let key = ElementKey::new("Conversion", "BaseConversion", "eff");
        let attrs = Attributes::new().with("Param", 0.9);
        let result = include_alias(&mut stores, &key, &attrs).unwrap();
        assert!(result.deps().is_empty());
        let param = stores.param(&Id::new("Conversion", "eff")).unwrap().unwrap();
        assert!(param.is_constant());
    }
}
