//! Creation order planning over the table dependency graph: determinism,
//! stable ties, and cycle handling.

use airlens::schema::DependencyGraph;

fn graph(ids: &[&str], deps: &[(&str, &str)]) -> DependencyGraph {
    let mut g = DependencyGraph::new(ids.iter().map(|s| s.to_string()));
    for (table, prereq) in deps {
        g.add_dependency(table, prereq);
    }
    g
}

#[test]
fn test_no_dependencies_keeps_input_order() {
    let plan = graph(&["c", "a", "b"], &[]).creation_plan();

    assert_eq!(plan.order, vec!["c", "a", "b"]);
    assert!(plan.circular.is_empty());
    assert!(plan.groups.is_empty());
}

#[test]
fn test_prerequisite_comes_first() {
    let plan = graph(&["orders", "customers"], &[("orders", "customers")]).creation_plan();

    assert_eq!(plan.order, vec!["customers", "orders"]);
}

#[test]
fn test_chain_ordering() {
    let plan = graph(
        &["a", "b", "c"],
        &[("a", "b"), ("b", "c")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["c", "b", "a"]);
}

#[test]
fn test_ties_broken_by_input_position() {
    // Both x and y depend only on base; x was listed first.
    let plan = graph(
        &["x", "y", "base"],
        &[("x", "base"), ("y", "base")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["base", "x", "y"]);
}

#[test]
fn test_two_cycle_flagged_and_ordered() {
    let plan = graph(&["a", "b"], &[("a", "b"), ("b", "a")]).creation_plan();

    assert_eq!(plan.order, vec!["a", "b"]);
    assert_eq!(plan.circular.len(), 2);
    assert!(plan.circular.contains("a"));
    assert!(plan.circular.contains("b"));
    assert_eq!(plan.groups.len(), 1);
}

#[test]
fn test_three_cycle_keeps_input_order() {
    let plan = graph(
        &["a", "b", "c"],
        &[("a", "b"), ("b", "c"), ("c", "a")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["a", "b", "c"]);
    assert_eq!(plan.circular.len(), 3);
}

#[test]
fn test_dependent_of_cycle_waits_for_it() {
    let plan = graph(
        &["late", "a", "b"],
        &[("a", "b"), ("b", "a"), ("late", "a")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["a", "b", "late"]);
    assert!(!plan.circular.contains("late"));
}

#[test]
fn test_cycle_with_upstream_prerequisite() {
    // The cycle itself depends on an acyclic table.
    let plan = graph(
        &["a", "b", "root"],
        &[("a", "b"), ("b", "a"), ("a", "root")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["root", "a", "b"]);
}

#[test]
fn test_self_dependency_is_ignored() {
    let plan = graph(&["a", "b"], &[("a", "a"), ("b", "a")]).creation_plan();

    assert_eq!(plan.order, vec!["a", "b"]);
    assert!(plan.circular.is_empty());
}

#[test]
fn test_duplicate_edges_are_deduplicated() {
    let plan = graph(
        &["a", "b"],
        &[("a", "b"), ("a", "b"), ("a", "b")],
    )
    .creation_plan();

    assert_eq!(plan.order, vec!["b", "a"]);
}

#[test]
fn test_plan_is_reproducible() {
    let g = graph(
        &["d", "c", "b", "a"],
        &[("d", "a"), ("c", "a"), ("b", "a")],
    );

    let first = g.creation_plan();
    for _ in 0..10 {
        assert_eq!(g.creation_plan().order, first.order);
    }
}
