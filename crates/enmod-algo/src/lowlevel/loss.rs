use std::sync::Arc;

use enmod_core::{
    Attributes, CoreError, CoreResult, Deps, ElementKey, Inclusion, LowLevelObject, ObjectStores,
};

/// Proportional loss on an arrow.
///
/// `utilisation` is validated and kept for reporting; the arrow coefficient
/// only uses `factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loss {
    pub factor: f64,
    pub utilisation: f64,
}

impl Loss {
    pub fn new(factor: f64, utilisation: f64) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&factor) {
            return Err(CoreError::structural(format!(
                "loss factor {factor} outside [0, 1]"
            )));
        }
        if !(utilisation > 0.0 && utilisation <= 1.0) {
            return Err(CoreError::structural(format!(
                "utilisation {utilisation} outside (0, 1]"
            )));
        }
        Ok(Self { factor, utilisation })
    }

    /// Share of the flow that arrives.
    pub fn retained(&self) -> f64 {
        1.0 - self.factor
    }
}

pub fn include_simple(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let loss = Loss::new(value.number("LossFactor")?, value.number("Utilisation")?)?;
    stores.insert_low(key.id(), LowLevelObject::Extension(Arc::new(loss)))?;
    Ok(Inclusion::Included(Deps::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_ranges() {
        assert!(Loss::new(0.05, 1.0).is_ok());
        assert!(Loss::new(1.2, 1.0).is_err());
        assert!(Loss::new(0.1, 0.0).is_err());
        assert!((Loss::new(0.25, 0.5).unwrap().retained() - 0.75).abs() < 1e-12);
    }
}
