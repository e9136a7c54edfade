//! Handlers for elements that produce low-level inputs: time vectors,
//! horizons, params, commodities, conversions, losses and prices.
//!
//! None of them create top-level objects. Commodities and losses are stored
//! as typed extensions so the objects that use them can downcast.

pub mod commodity;
pub mod horizon;
pub mod loss;
pub mod param;
pub mod timevector;

use std::sync::Arc;

use enmod_core::{AttrValue, Attributes, CoreError, CoreResult, Deps, Id, ObjectStores};
use enmod_ts::{ConstantTimeVector, TimeVector};

use crate::concepts::TIME_VECTOR;

pub use commodity::Commodity;
pub use loss::Loss;

/// A whole-number attribute such as a period count.
pub(crate) fn count(value: &Attributes, key: &str) -> CoreResult<usize> {
    whole_count(key, value.number(key)?)
}

pub(crate) fn whole_count(key: &str, number: f64) -> CoreResult<usize> {
    if number < 1.0 || number.fract() != 0.0 {
        return Err(CoreError::structural(format!(
            "{key} must be a positive whole number, got {number}"
        )));
    }
    Ok(number as usize)
}

/// Resolve a number (constant vector) or a `TimeVector` reference.
pub(crate) fn resolve_time_vector(
    stores: &ObjectStores,
    value: &Attributes,
    key: &str,
    deps: &mut Deps,
) -> CoreResult<Option<Arc<dyn TimeVector>>> {
    match value.get(key)? {
        AttrValue::Number(number) => Ok(Some(Arc::new(ConstantTimeVector::new(*number)))),
        AttrValue::Text(name) => {
            let id = deps.track(Id::new(TIME_VECTOR, name.as_str()));
            stores.time_vector(&id)
        }
        other => Err(CoreError::Attribute(enmod_core::AttrError::WrongType {
            key: key.to_string(),
            expected: "number or reference",
            found: other.kind(),
        })),
    }
}
