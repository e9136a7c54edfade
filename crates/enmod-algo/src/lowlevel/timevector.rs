use std::sync::Arc;

use enmod_core::{
    Attributes, CoreError, CoreResult, Deps, ElementKey, Inclusion, LowLevelObject, ObjectStores,
};
use enmod_ts::{
    parse_datetime, ConstantTimeVector, InfiniteTimeVector, NaiveDateTime, RotatingTimeVector,
};

fn index(value: &Attributes) -> CoreResult<Vec<NaiveDateTime>> {
    value
        .text_list("Index")?
        .iter()
        .map(|stamp| parse_datetime(stamp).map_err(CoreError::from))
        .collect()
}

pub fn include_constant(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let vector = ConstantTimeVector::new(value.number("Value")?);
    stores.insert_low(key.id(), LowLevelObject::TimeVector(Arc::new(vector)))?;
    Ok(Inclusion::Included(Deps::new()))
}

pub fn include_infinite(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let vector = InfiniteTimeVector::new(index(value)?, value.number_list("Values")?.to_vec())?;
    stores.insert_low(key.id(), LowLevelObject::TimeVector(Arc::new(vector)))?;
    Ok(Inclusion::Included(Deps::new()))
}

/// Repeats `[Index[0], Stop)` forever in both directions.
pub fn include_rotating(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let stop = parse_datetime(value.text("Stop")?)?;
    let values = value.number_list("Values")?.to_vec();
    let vector = RotatingTimeVector::new(index(value)?, values, stop)?;
    stores.insert_low(key.id(), LowLevelObject::TimeVector(Arc::new(vector)))?;
    Ok(Inclusion::Included(Deps::new()))
}
