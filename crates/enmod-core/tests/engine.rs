//! Integration tests for the inclusion and assembly fixed points, using a
//! small registry of test handlers instead of the built-in catalogue.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use enmod_core::{
    compile, dependency_closure, Assemble, AssemblyContext, Attributes, CompileOptions, CoreError,
    CoreResult, DataElement, Deps, ElementKey, Id, Inclusion, LowLevelObject, ModelObject,
    ObjectStores, Problem, ProblemParticipant, TypeRegistry,
};
use enmod_ts::{ConstantParam, ProbTime};

/// Test object: depth in a parent chain, derived during assembly.
#[derive(Debug)]
struct Node {
    id: Id,
    parent: Option<Id>,
    weight: Option<Id>,
    depth: Option<usize>,
}

impl Assemble for Node {
    fn assemble(&mut self, ctx: &AssemblyContext<'_>) -> CoreResult<bool> {
        let depth = match &self.parent {
            None => 0,
            Some(parent) => match ctx.get_as::<Node>(parent) {
                Some(node) => match node.depth {
                    Some(depth) => depth + 1,
                    None => return Err(CoreError::structural("assembled parent without depth")),
                },
                None => return Ok(false),
            },
        };
        self.depth = Some(depth);
        Ok(true)
    }
}

impl ProblemParticipant for Node {
    fn build(&self, _problem: &mut dyn Problem) -> CoreResult<()> {
        Ok(())
    }

    fn set_constants(&self, _problem: &mut dyn Problem) -> CoreResult<()> {
        Ok(())
    }

    fn update(&self, _problem: &mut dyn Problem, _start: &ProbTime) -> CoreResult<()> {
        Ok(())
    }
}

impl ModelObject for Node {
    fn id(&self) -> &Id {
        &self.id
    }

    fn references(&self) -> Vec<Id> {
        self.parent.iter().chain(self.weight.iter()).cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `Node:Base` resolves its parent and optional weight during inclusion;
/// `Node:Late` only names its parent and leaves it to assembly.
fn include_node(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let mut deps = Deps::new();
    let parent = value.opt_text("Parent")?.map(|name| Id::new("Node", name));
    let weight = value.opt_text("Weight")?.map(|name| Id::new("Weight", name));

    let mut ready = true;
    for id in parent.iter().chain(weight.iter()) {
        let id = deps.track(id.clone());
        ready &= stores.contains(&id);
    }
    if !ready {
        return Ok(Inclusion::Deferred(deps));
    }

    stores.insert_top(Box::new(Node {
        id: key.id(),
        parent,
        weight,
        depth: None,
    }))?;
    Ok(Inclusion::Included(deps))
}

fn include_late_node(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let parent = value.opt_text("Parent")?.map(|name| Id::new("Node", name));
    stores.insert_top(Box::new(Node {
        id: key.id(),
        parent,
        weight: None,
        depth: None,
    }))?;
    Ok(Inclusion::Included(Deps::new()))
}

fn include_weight(
    stores: &mut ObjectStores,
    key: &ElementKey,
    value: &Attributes,
) -> CoreResult<Inclusion> {
    let value = value.number("Value")?;
    if value < 0.0 {
        return Err(CoreError::structural(format!("negative weight {value}")));
    }
    stores.insert_low(key.id(), LowLevelObject::Param(Arc::new(ConstantParam::new(value))))?;
    Ok(Inclusion::Included(Deps::new()))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register("Node", "Base", include_node)
        .register("Node", "Late", include_late_node)
        .register("Weight", "Const", include_weight);
    registry
}

fn node(name: &str, parent: Option<&str>) -> DataElement {
    let mut attrs = Attributes::new();
    if let Some(parent) = parent {
        attrs.insert("Parent", parent);
    }
    DataElement::new("Node", "Base", name, attrs)
}

fn weight(name: &str, value: f64) -> DataElement {
    DataElement::new("Weight", "Const", name, Attributes::new().with("Value", value))
}

/// A chain d -> c -> b -> a plus a weighted leaf, listed leaf-first so the
/// fixed point needs several rounds.
fn chain() -> Vec<DataElement> {
    vec![
        node("d", Some("c")),
        node("c", Some("b")),
        DataElement::new(
            "Node",
            "Base",
            "w",
            Attributes::new().with("Parent", "a").with("Weight", "heavy"),
        ),
        node("b", Some("a")),
        weight("heavy", 2.0),
        node("a", None),
    ]
}

fn permutations(items: &[DataElement]) -> Vec<Vec<DataElement>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            result.push(tail);
        }
    }
    result
}

#[test]
fn test_chain_compiles_and_assembles() {
    let output = compile(&chain(), &registry(), CompileOptions::default()).unwrap();
    assert_eq!(output.objects.len(), 5);
    let d = output.objects.get_as::<Node>(&Id::new("Node", "d")).unwrap();
    assert_eq!(d.depth, Some(3));
    let w = output.objects.get_as::<Node>(&Id::new("Node", "w")).unwrap();
    assert_eq!(w.depth, Some(1));
    assert!(output.objects.low_level().contains_key(&Id::new("Weight", "heavy")));
}

/// Every permutation of the input yields the same graph.
#[test]
fn test_order_independence() {
    let registry = registry();
    let reference = compile(&chain(), &registry, CompileOptions::default())
        .unwrap()
        .objects
        .fingerprint();

    for permutation in permutations(&chain()) {
        let output = compile(&permutation, &registry, CompileOptions::default()).unwrap();
        assert_eq!(output.objects.fingerprint(), reference);
    }
}

/// Duplicate keys are rejected before any handler runs.
#[test]
fn test_duplicates_rejected_before_handlers() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    let mut registry = TypeRegistry::new();
    registry.register(
        "Node",
        "Base",
        |stores: &mut ObjectStores, key: &ElementKey, value: &Attributes| -> CoreResult<Inclusion> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            include_node(stores, key, value)
        },
    );
    let elements = vec![node("a", None), node("b", None), node("a", None)];

    let err = compile(&elements, &registry, CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateElements(ref keys) if keys.len() == 1));
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

/// A bad reference terminates with exactly the referencing element as root
/// cause; its dependents are cascades.
#[test]
fn test_unresolvable_reports_only_root_cause() {
    let mut elements = chain();
    elements.push(node("x", Some("ghost")));
    elements.push(node("y", Some("x")));
    elements.push(node("z", Some("y")));

    let err = compile(&elements, &registry(), CompileOptions::default()).unwrap_err();
    let report = match err {
        CoreError::Unresolvable(report) => report,
        other => panic!("expected unresolvable error, got {other}"),
    };
    assert_eq!(report.failed, 3);
    assert_eq!(report.total, 9);
    assert_eq!(report.cascades, 2);
    assert_eq!(report.root_causes.len(), 1);
    assert_eq!(report.root_causes[0].element, ElementKey::new("Node", "Base", "x"));
    assert_eq!(
        report.lines(),
        vec!["missing element Node:ghost referenced by Node:Base:x".to_string()]
    );
}

#[test]
fn test_unregistered_type_is_fatal() {
    let elements = vec![node("a", None), DataElement::new("Node", "Fancy", "b", Attributes::new())];
    let err = compile(&elements, &registry(), CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::UnregisteredType { ref element, .. } if element.instance == "b"
    ));
}

/// Handler errors are not turned into deferrals and carry the element key.
#[test]
fn test_handler_error_propagates_with_element() {
    let elements = vec![weight("neg", -1.0)];
    let err = compile(&elements, &registry(), CompileOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Weight:Const:neg: Structural error: negative weight -1");
    assert!(matches!(err.root(), CoreError::Structural(_)));
}

fn included_without_change(
    _: &mut ObjectStores,
    _: &ElementKey,
    _: &Attributes,
) -> CoreResult<Inclusion> {
    Ok(Inclusion::Included(Deps::new()))
}

fn deferred_after_change(
    stores: &mut ObjectStores,
    key: &ElementKey,
    _: &Attributes,
) -> CoreResult<Inclusion> {
    stores.insert_low(key.id(), LowLevelObject::Param(Arc::new(ConstantParam::new(1.0))))?;
    Ok(Inclusion::Deferred(Deps::new()))
}

fn included_with_absent_dependency(
    stores: &mut ObjectStores,
    key: &ElementKey,
    _: &Attributes,
) -> CoreResult<Inclusion> {
    stores.insert_low(key.id(), LowLevelObject::Param(Arc::new(ConstantParam::new(1.0))))?;
    let mut deps = Deps::new();
    deps.push(Id::new("Weight", "nowhere"));
    Ok(Inclusion::Included(deps))
}

fn expect_malformed(registry: &TypeRegistry, expected: &str) {
    let elements = vec![DataElement::new("Bad", "Handler", "b", Attributes::new())];
    match compile(&elements, registry, CompileOptions::default()) {
        Err(CoreError::MalformedReturn { reason, .. }) => {
            assert!(reason.contains(expected), "{reason}")
        }
        other => panic!("expected malformed return, got {other:?}"),
    }
}

#[test]
fn test_malformed_returns_are_detected() {
    let mut registry = TypeRegistry::new();
    registry.register("Bad", "Handler", included_without_change);
    expect_malformed(&registry, "without changing storage");

    registry.register("Bad", "Handler", deferred_after_change);
    expect_malformed(&registry, "deferred after changing storage");

    registry.register("Bad", "Handler", included_with_absent_dependency);
    expect_malformed(&registry, "Weight:nowhere is not in storage");
}

/// Recorded dependencies of completed elements all exist in storage.
#[test]
fn test_dependency_completeness() {
    let registry = registry();
    let outcome = enmod_core::inclusion::include_elements(&chain(), &registry).unwrap();
    for record in &outcome.records {
        for id in &record.ids {
            assert!(outcome.stores.contains(id), "{id} missing");
        }
    }
}

#[test]
fn test_dependency_index_map_and_closure() {
    let options = CompileOptions {
        validate: true,
        want_dependencies: true,
    };
    let elements = chain();
    let output = compile(&elements, &registry(), options).unwrap();
    let map = output.dependencies.unwrap();

    // d(0) -> c(1), w(2) -> a(5) and heavy(4), b(3) -> a(5)
    assert_eq!(map[&0], vec![1]);
    assert_eq!(map[&2], vec![4, 5]);
    assert_eq!(map[&5], Vec::<usize>::new());

    let closure: Vec<usize> = dependency_closure(&map, &[0]).into_iter().collect();
    assert_eq!(closure, vec![0, 1, 3, 5]);

    // The closure alone compiles.
    let subset: Vec<DataElement> = closure.iter().map(|&i| elements[i].clone()).collect();
    assert_eq!(
        compile(&subset, &registry(), CompileOptions::default()).unwrap().objects.len(),
        4
    );
}

/// Objects whose collaborators never assemble end in a deadlock error that
/// lists them.
#[test]
fn test_assembly_deadlock() {
    let elements = vec![
        node("root", None),
        DataElement::new("Node", "Late", "p", Attributes::new().with("Parent", "q")),
        DataElement::new("Node", "Late", "q", Attributes::new().with("Parent", "p")),
    ];
    let err = compile(&elements, &registry(), CompileOptions::default()).unwrap_err();
    match err {
        CoreError::AssemblyDeadlock { pending } => {
            assert_eq!(pending, vec![Id::new("Node", "p"), Id::new("Node", "q")])
        }
        other => panic!("expected deadlock, got {other}"),
    }
}

/// Post-compilation validation catches references that inclusion did not
/// resolve; skipping validation lets the same graph through.
#[test]
fn test_post_validation_of_references() {
    let elements = vec![
        DataElement::new("Node", "Late", "orphan", Attributes::new().with("Parent", "root")),
        DataElement::new("Node", "Late", "root", Attributes::new()),
        DataElement::new("Node", "Late", "other", Attributes::new().with("Parent", "root")),
    ];
    assert!(compile(&elements, &registry(), CompileOptions::default()).is_ok());

    let mut registry = registry();
    registry.register(
        "Node",
        "Dangling",
        |stores: &mut ObjectStores, key: &ElementKey, _: &Attributes| -> CoreResult<Inclusion> {
            stores.insert_top(Box::new(Node {
                id: key.id(),
                parent: None,
                weight: Some(Id::new("Weight", "absent")),
                depth: None,
            }))?;
            Ok(Inclusion::Included(Deps::new()))
        },
    );
    let elements = vec![DataElement::new("Node", "Dangling", "n", Attributes::new())];
    assert!(matches!(
        compile(&elements, &registry, CompileOptions::default()),
        Err(CoreError::Validation(_))
    ));
    let unchecked = CompileOptions {
        validate: false,
        want_dependencies: false,
    };
    assert!(compile(&elements, &registry, unchecked).is_ok());
}

/// Same input, same order, same graph.
#[test]
fn test_compile_is_deterministic() {
    let first = compile(&chain(), &registry(), CompileOptions::default()).unwrap();
    let second = compile(&chain(), &registry(), CompileOptions::default()).unwrap();
    assert_eq!(first.objects.fingerprint(), second.objects.fingerprint());
}
