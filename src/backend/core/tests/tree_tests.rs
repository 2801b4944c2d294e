//! Integration tests for building workspace trees.

use wsaccess_core::workspace::{
    build_tree, BuildOptions, HierarchyError, RootPolicy, WorkspaceId, WorkspaceRecord,
    WorkspaceTree,
};

fn names(tree: &WorkspaceTree, of: &str) -> Vec<String> {
    let idx = tree.find(&WorkspaceId::new(of)).unwrap();
    tree.children(idx)
        .iter()
        .map(|&child| tree[child].name().to_string())
        .collect()
}

#[test]
fn test_root_children_sorted_case_insensitively() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("ws-1", "root", "Production"),
        WorkspaceRecord::child("ws-2", "root", "Development"),
    ];

    let tree = build_tree(&records).unwrap();

    assert_eq!(tree.root_node().id(), &WorkspaceId::new("root"));
    assert_eq!(names(&tree, "root"), vec!["Development", "Production"]);
}

#[test]
fn test_sort_ignores_case_and_breaks_ties_by_id() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("c", "root", "beta"),
        WorkspaceRecord::child("b", "root", "Alpha"),
        WorkspaceRecord::child("a", "root", "alpha"),
    ];

    let tree = build_tree(&records).unwrap();
    let ids: Vec<&str> = tree
        .children(tree.root())
        .iter()
        .map(|&i| tree[i].id().as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_two_node_cycle_is_rejected() {
    let records = vec![
        WorkspaceRecord::child("a", "b", "A"),
        WorkspaceRecord::child("b", "a", "B"),
    ];

    let err = build_tree(&records).unwrap_err();
    assert!(matches!(err, HierarchyError::CyclicHierarchy { .. }));
}

#[test]
fn test_cycle_below_a_valid_root() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("x", "z", "X"),
        WorkspaceRecord::child("y", "x", "Y"),
        WorkspaceRecord::child("z", "y", "Z"),
    ];

    let err = build_tree(&records).unwrap_err();
    assert!(matches!(err, HierarchyError::CyclicHierarchy { .. }));
}

#[test]
fn test_self_parent_is_a_cycle() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("loop", "loop", "Loop"),
    ];

    assert_eq!(
        build_tree(&records).unwrap_err(),
        HierarchyError::CyclicHierarchy {
            id: WorkspaceId::new("loop")
        }
    );
}

#[test]
fn test_orphan_is_rejected() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("ws-1", "missing", "Lost"),
    ];

    assert_eq!(
        build_tree(&records).unwrap_err(),
        HierarchyError::OrphanedNode {
            id: WorkspaceId::new("ws-1"),
            parent_id: WorkspaceId::new("missing"),
        }
    );
}

#[test]
fn test_empty_input_has_no_root() {
    assert_eq!(build_tree(&[]).unwrap_err(), HierarchyError::NoRoot);
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("ws-1", "root", "One"),
        WorkspaceRecord::child("ws-1", "root", "Other"),
    ];

    assert!(matches!(
        build_tree(&records).unwrap_err(),
        HierarchyError::DuplicateId { .. }
    ));
}

#[test]
fn test_multiple_roots_strict_and_first_wins() {
    let records = vec![
        WorkspaceRecord::root("r1", "First"),
        WorkspaceRecord::child("a", "r1", "A"),
        WorkspaceRecord::root("r2", "Second"),
        WorkspaceRecord::child("b", "r2", "B"),
    ];

    assert!(matches!(
        build_tree(&records).unwrap_err(),
        HierarchyError::MultipleRoots { .. }
    ));

    let options = BuildOptions::default().with_root_policy(RootPolicy::FirstWins);
    let tree = WorkspaceTree::build_with(&records, options).unwrap();
    assert_eq!(tree.root_node().id(), &WorkspaceId::new("r1"));
    assert_eq!(tree.len(), 2);
    assert!(!tree.contains(&WorkspaceId::new("b")));
}

#[test]
fn test_node_count_equals_record_count() {
    // A deep, wide hierarchy with records in reverse order.
    let mut records = vec![WorkspaceRecord::root("root", "Default")];
    for i in 0..20 {
        records.push(WorkspaceRecord::child(format!("team-{i}"), "root", format!("Team {i}")));
        for j in 0..5 {
            records.push(WorkspaceRecord::child(
                format!("team-{i}-env-{j}"),
                format!("team-{i}"),
                format!("Env {j}"),
            ));
        }
    }
    records.reverse();

    let tree = build_tree(&records).unwrap();
    assert_eq!(tree.len(), records.len());
    assert_eq!(tree.root_node().id(), &WorkspaceId::new("root"));
}

#[test]
fn test_ancestors_run_root_to_target() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("a", "root", "A"),
        WorkspaceRecord::child("b", "a", "B"),
        WorkspaceRecord::child("n", "b", "N"),
    ];
    let tree = build_tree(&records).unwrap();
    let n = tree.find(&WorkspaceId::new("n")).unwrap();

    let chain: Vec<&str> = tree
        .ancestors(n)
        .into_iter()
        .map(|i| tree[i].id().as_str())
        .collect();
    assert_eq!(chain, vec!["root", "a", "b", "n"]);
    assert_eq!(tree[n].depth(), 3);
    assert!(tree[n].is_leaf());
}

#[test]
fn test_records_deserialize_from_wire_format() {
    let json = r#"[
        {"id":"root","name":"Default","description":"","parentId":null,"kind":"root"},
        {"id":"ws-1","name":"Production","parentId":"root"}
    ]"#;
    let records: Vec<WorkspaceRecord> = serde_json::from_str(json).unwrap();
    let tree = build_tree(&records).unwrap();
    assert_eq!(tree.len(), 2);
}
