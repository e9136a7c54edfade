use std::sync::Arc;

use enmod_core::{
    Attributes, CoreError, CoreResult, Deps, ElementKey, Inclusion, LowLevelObject, ObjectStores,
};
use enmod_ts::{from_hours, Duration, SequentialHorizon};

use super::{count, whole_count};

/// `NumPeriods` periods of `PeriodHours`, or blocks given as parallel
/// `Counts` and `Hours` lists.
pub fn include_sequential(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let horizon = if value.contains("NumPeriods") {
        let periods = count(value, "NumPeriods")?;
        SequentialHorizon::uniform(periods, from_hours(value.number("PeriodHours")?))?
    } else {
        let counts = value.number_list("Counts")?;
        let hours = value.number_list("Hours")?;
        if counts.len() != hours.len() {
            return Err(CoreError::structural(format!(
                "Counts has {} entries but Hours has {}",
                counts.len(),
                hours.len()
            )));
        }
        let blocks = counts
            .iter()
            .zip(hours)
            .map(|(&n, &h)| Ok((whole_count("Counts", n)?, from_hours(h))))
            .collect::<CoreResult<Vec<(usize, Duration)>>>()?;
        SequentialHorizon::new(&blocks)?
    };
    stores.insert_low(key.id(), LowLevelObject::Horizon(Arc::new(horizon)))?;
    Ok(Inclusion::Included(Deps::new()))
}
