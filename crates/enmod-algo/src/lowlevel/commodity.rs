use std::fmt;
use std::sync::Arc;

use enmod_core::{
    Attributes, CoreResult, Deps, ElementKey, Id, Inclusion, LowLevelObject, ObjectStores,
};
use enmod_ts::Horizon;

use crate::concepts::{HORIZON, POWER};

/// A traded good (power, gas, water) and the horizon its balances use.
#[derive(Clone)]
pub struct Commodity {
    pub name: String,
    pub horizon_id: Id,
    pub horizon: Arc<dyn Horizon>,
}

impl Commodity {
    /// Power balances get a slack flow.
    pub fn is_power(&self) -> bool {
        self.name == POWER
    }
}

impl fmt::Debug for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commodity")
            .field("name", &self.name)
            .field("horizon", &self.horizon_id)
            .field("periods", &self.horizon.num_periods())
            .finish()
    }
}

pub fn include_base(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let horizon_id = deps.track(Id::new(HORIZON, value.text("Horizon")?));
    let Some(horizon) = stores.horizon(&horizon_id)? else {
        return Ok(Inclusion::Deferred(deps));
    };
    let commodity = Commodity {
        name: key.instance.clone(),
        horizon_id,
        horizon,
    };
    stores.insert_low(key.id(), LowLevelObject::Extension(Arc::new(commodity)))?;
    Ok(Inclusion::Included(deps))
}
