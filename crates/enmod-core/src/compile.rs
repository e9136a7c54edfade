//! Compilation entry point: inclusion, assembly and validation in one call.

use std::collections::BTreeMap;

use tracing::info;

use crate::assembly::assemble;
use crate::diagnostics::Diagnostics;
use crate::element::DataElement;
use crate::error::CoreResult;
use crate::inclusion::include_elements;
use crate::registry::TypeRegistry;
use crate::store::ModelObjects;
use crate::validation::validate_objects;

/// Element position -> sorted positions of the elements it depended on.
pub type DependencyIndexMap = BTreeMap<usize, Vec<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the post-compilation reference check
    pub validate: bool,
    /// Return the dependency index map
    pub want_dependencies: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            validate: true,
            want_dependencies: false,
        }
    }
}

#[derive(Debug)]
pub struct CompileOutput {
    pub objects: ModelObjects,
    pub dependencies: Option<DependencyIndexMap>,
    /// Warnings from the registry's object checks
    pub diagnostics: Diagnostics,
}

/// Compile `elements` into assembled top-level objects.
///
/// Either the whole graph is returned or an error; callers never see a
/// partially compiled graph.
pub fn compile(
    elements: &[DataElement],
    registry: &TypeRegistry,
    options: CompileOptions,
) -> CoreResult<CompileOutput> {
    let outcome = include_elements(elements, registry)?;
    let dependencies = options
        .want_dependencies
        .then(|| outcome.dependency_index_map(elements));
    let inclusion_rounds = outcome.rounds;

    let mut objects = outcome.stores.into_model_objects();
    let assembly_rounds = assemble(&mut objects.top)?;

    let diagnostics = if options.validate {
        validate_objects(&objects, registry.object_checks())?
    } else {
        Diagnostics::new()
    };

    info!(
        elements = elements.len(),
        objects = objects.len(),
        low_level = objects.low_level().len(),
        inclusion_rounds,
        assembly_rounds,
        "compiled dataset"
    );

    Ok(CompileOutput {
        objects,
        dependencies,
        diagnostics,
    })
}
