//! Post-compilation checks registered with the default registry.

use std::collections::BTreeSet;

use enmod_core::{Diagnostics, Id, ModelObjects};
use tracing::warn;

use crate::concepts::BALANCE;

/// Warn about balances that no other object references. Such a balance
/// still builds, but its rows only ever hold the right-hand side.
pub fn unconnected_balances(objects: &ModelObjects, diag: &mut Diagnostics) {
    let referenced: BTreeSet<Id> = objects
        .iter()
        .flat_map(|(id, object)| {
            object
                .references()
                .into_iter()
                .filter(move |reference| reference != id)
        })
        .collect();

    for id in objects.ids() {
        if id.concept == BALANCE && !referenced.contains(id) {
            warn!(balance = %id, "balance has no connected flows");
            diag.add_warning_for("validation", "balance has no connected flows", &id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_registry;
    use crate::test_utils::*;
    use enmod_core::{compile, validate_objects, CompileOptions, Severity};

    #[test]
    fn test_connected_balance_is_quiet() {
        let out = compile(&single_flow_dataset(), &default_registry(), CompileOptions::default())
            .unwrap();
        let mut diag = Diagnostics::new();
        unconnected_balances(&out.objects, &mut diag);
        assert!(!diag.has_issues());
    }

    #[test]
    fn test_lone_balance_is_flagged_once() {
        let mut elements = single_flow_dataset();
        elements.push(balance("Island", "Power"));
        let options = CompileOptions {
            validate: false,
            ..CompileOptions::default()
        };
        let out = compile(&elements, &default_registry(), options).unwrap();
        assert!(!out.diagnostics.has_issues());

        let diag = validate_objects(&out.objects, &[unconnected_balances]).unwrap();
        assert_eq!(diag.issues.len(), 1);
        assert_eq!(diag.issues[0].severity, Severity::Warning);
        assert_eq!(diag.issues[0].element.as_deref(), Some("Balance:Island"));
    }
}
