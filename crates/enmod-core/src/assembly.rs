//! Assembly engine: second fixed point, over top-level objects.
//!
//! Each round visits the unassembled objects in `Id` order. The visited
//! object is taken out of storage and sees only objects that already
//! completed assembly, so derived state is never computed from a
//! half-assembled collaborator and no object is assembled twice.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::identity::Id;
use crate::object::{AssemblyContext, ModelObject};

/// Assemble every object in place. Returns the number of rounds used.
pub fn assemble(objects: &mut BTreeMap<Id, Box<dyn ModelObject>>) -> CoreResult<usize> {
    let mut assembled: BTreeSet<Id> = BTreeSet::new();
    let mut rounds = 0;

    while assembled.len() < objects.len() {
        rounds += 1;
        let pending: Vec<Id> = objects
            .keys()
            .filter(|id| !assembled.contains(*id))
            .cloned()
            .collect();
        let mut progress = 0;

        for id in pending {
            let Some(mut object) = objects.remove(&id) else {
                continue;
            };
            let result = {
                let ctx = AssemblyContext::new(objects, &assembled);
                object.assemble(&ctx)
            };
            objects.insert(id.clone(), object);
            if result? {
                assembled.insert(id);
                progress += 1;
            }
        }

        let remaining = objects.len() - assembled.len();
        debug!(round = rounds, progress, remaining, "assembly round");

        if progress == 0 {
            let pending = objects
                .keys()
                .filter(|id| !assembled.contains(*id))
                .cloned()
                .collect();
            return Err(CoreError::AssemblyDeadlock { pending });
        }
    }

    Ok(rounds)
}
