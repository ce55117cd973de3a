//! Dependency resolution tests

use super::test_utils::*;
use modhost::module::registry::{ModuleDependencies, ResolutionError};

fn order(defs: &[modhost::module::ModuleDefinition]) -> Vec<String> {
    ModuleDependencies::resolve(defs)
        .unwrap()
        .ids()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn test_dependency_starts_first() {
    let defs = vec![
        definition("B", "1.0", &[("A", ">=1.0")]),
        definition("A", "1.0", &[]),
    ];
    assert_eq!(order(&defs), vec!["A@1.0", "B@1.0"]);
}

#[test]
fn test_missing_dependency_message() {
    let defs = vec![definition("A", "1.0", &[("B", "1.0")])];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    assert!(matches!(err, ResolutionError::MissingDependency { .. }));
    assert_eq!(err.to_string(), "missing dependency: B@1.0 required by A@1.0");
}

#[test]
fn test_version_mismatch_lists_available() {
    let defs = vec![
        definition("app", "1.0", &[("lib", ">=2.0")]),
        definition("lib", "1.5", &[]),
        definition("lib", "1.0", &[]),
    ];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    assert_eq!(
        err.to_string(),
        "version mismatch: app@1.0 requires lib@>=2.0, available versions: 1.0, 1.5"
    );
}

#[test]
fn test_highest_matching_version_selected() {
    let defs = vec![
        definition("app", "1.0", &[("lib", "^1.0")]),
        definition("lib", "1.0", &[]),
        definition("lib", "1.5", &[]),
        definition("lib", "2.0", &[]),
    ];
    let plan = ModuleDependencies::resolve(&defs).unwrap();
    assert_eq!(plan.dependencies_of(&id("app@1.0")), &[id("lib@1.5")]);
    assert!(plan.position(&id("lib@1.5")) < plan.position(&id("app@1.0")));
    assert_eq!(plan.len(), 4);
}

#[test]
fn test_older_version_satisfies_when_newest_depends_back() {
    let defs = vec![
        definition("a", "1.0", &[("b", ">=1.0")]),
        definition("b", "1.0", &[]),
        definition("b", "2.0", &[("a", "1.0")]),
    ];
    let plan = ModuleDependencies::resolve(&defs).unwrap();
    assert_eq!(order(&defs), vec!["b@1.0", "a@1.0", "b@2.0"]);
    assert_eq!(plan.dependencies_of(&id("a@1.0")), &[id("b@1.0")]);
    assert_eq!(plan.dependencies_of(&id("b@2.0")), &[id("a@1.0")]);
}

#[test]
fn test_cycle_reported_when_no_version_breaks_it() {
    let defs = vec![
        definition("a", "1.0", &[("b", ">=2.0")]),
        definition("b", "1.0", &[]),
        definition("b", "2.0", &[("a", "1.0")]),
    ];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    assert_eq!(
        err.to_string(),
        "dependency cycle detected: a@1.0 -> b@2.0 -> a@1.0"
    );
}

#[test]
fn test_cycle_names_both_modules() {
    let defs = vec![
        definition("a", "1.0", &[("b", ">=1.0")]),
        definition("b", "1.0", &[("a", ">=1.0")]),
    ];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    let ResolutionError::Cycle { cycle } = &err else {
        panic!("expected cycle, got {err}");
    };
    assert_eq!(cycle.first(), cycle.last());
    assert!(cycle.contains(&id("a@1.0")));
    assert!(cycle.contains(&id("b@1.0")));
    assert_eq!(err.to_string(), "dependency cycle detected: a@1.0 -> b@1.0 -> a@1.0");
}

#[test]
fn test_cycle_behind_acyclic_prefix() {
    let defs = vec![
        definition("base", "1.0", &[]),
        definition("x", "1.0", &[("base", "1.0"), ("z", "1.0")]),
        definition("y", "1.0", &[("x", "1.0")]),
        definition("z", "1.0", &[("y", "1.0")]),
    ];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    let ResolutionError::Cycle { cycle } = err else {
        panic!("expected cycle");
    };
    assert_eq!(cycle.len(), 4);
    assert!(!cycle.contains(&id("base@1.0")));
}

#[test]
fn test_ties_break_by_name_then_version() {
    let defs = vec![
        definition("zeta", "1.0", &[]),
        definition("alpha", "2.0", &[]),
        definition("alpha", "1.0", &[]),
        definition("mid", "0.1", &[]),
    ];
    assert_eq!(order(&defs), vec!["alpha@1.0", "alpha@2.0", "mid@0.1", "zeta@1.0"]);
}

#[test]
fn test_diamond() {
    let defs = vec![
        definition("app", "1.0", &[("left", "1.0"), ("right", "1.0")]),
        definition("right", "1.0", &[("core", "1.0")]),
        definition("left", "1.0", &[("core", "1.0")]),
        definition("core", "1.0", &[]),
    ];
    assert_eq!(
        order(&defs),
        vec!["core@1.0", "left@1.0", "right@1.0", "app@1.0"]
    );
}

#[test]
fn test_first_failure_in_requester_order() {
    let defs = vec![
        definition("zz", "1.0", &[("ghost", "1.0")]),
        definition("aa", "1.0", &[("phantom", "1.0")]),
    ];
    let err = ModuleDependencies::resolve(&defs).unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing dependency: phantom@1.0 required by aa@1.0"
    );
}

#[test]
fn test_empty_input() {
    assert!(ModuleDependencies::resolve(&[]).unwrap().is_empty());
}
