//! Integration tests for effective binding resolution.

use wsaccess_core::workspace::{
    build_tree, resolve_effective, BindingIndex, RoleBinding, SubjectType, WorkspaceId,
    WorkspaceRecord, WorkspaceTree,
};

fn chain_tree() -> WorkspaceTree {
    build_tree(&[
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("a", "root", "A"),
        WorkspaceRecord::child("b", "a", "B"),
        WorkspaceRecord::child("n", "b", "N"),
        WorkspaceRecord::child("side", "root", "Side"),
    ])
    .unwrap()
}

fn binding(role: &str, subject: &str, ws: &str) -> RoleBinding {
    RoleBinding::new(role, role, subject, SubjectType::Group, ws)
}

#[test]
fn test_inherited_from_root_only() {
    let tree = build_tree(&[
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("ws-1", "root", "Production"),
    ])
    .unwrap();
    let index = BindingIndex::from_bindings([binding("viewer", "ops", "root")]);

    let effective = resolve_effective(&tree, &WorkspaceId::new("ws-1"), &index).unwrap();

    assert_eq!(effective.len(), 1);
    let only = &effective.as_slice()[0];
    assert_eq!(only.role_id.as_str(), "viewer");
    assert!(only.is_inherited);
    assert_eq!(only.source_workspace_id, WorkspaceId::new("root"));
}

#[test]
fn test_chain_concatenates_root_first() {
    let tree = chain_tree();
    let index = BindingIndex::from_bindings([
        binding("n-role", "g1", "n"),
        binding("b-role", "g1", "b"),
        binding("root-role", "g1", "root"),
        binding("a-role", "g1", "a"),
        binding("a-role-2", "g2", "a"),
        binding("side-role", "g1", "side"),
    ]);

    let effective = resolve_effective(&tree, &WorkspaceId::new("n"), &index).unwrap();

    let roles: Vec<&str> = effective.iter().map(|b| b.role_id.as_str()).collect();
    assert_eq!(roles, vec!["root-role", "a-role", "a-role-2", "b-role", "n-role"]);

    for entry in &effective {
        assert_eq!(entry.is_inherited, entry.source_workspace_id.as_str() != "n");
    }
    assert_eq!(effective.direct().count(), 1);
    assert_eq!(effective.inherited().count(), 4);
}

#[test]
fn test_descendant_binding_does_not_shadow() {
    let tree = chain_tree();
    let index = BindingIndex::from_bindings([
        binding("admin", "g1", "root"),
        binding("viewer", "g1", "b"),
    ]);

    let effective = resolve_effective(&tree, &WorkspaceId::new("b"), &index).unwrap();
    let roles: Vec<&str> = effective.iter().map(|b| b.role_id.as_str()).collect();
    assert_eq!(roles, vec!["admin", "viewer"]);
}

#[test]
fn test_root_gets_only_direct_bindings() {
    let tree = chain_tree();
    let index = BindingIndex::from_bindings([
        binding("root-role", "g1", "root"),
        binding("a-role", "g1", "a"),
    ]);

    let effective = resolve_effective(&tree, &WorkspaceId::new("root"), &index).unwrap();
    assert_eq!(effective.len(), 1);
    assert!(!effective.as_slice()[0].is_inherited);
}

#[test]
fn test_no_bindings_anywhere_is_empty_not_error() {
    let effective =
        resolve_effective(&chain_tree(), &WorkspaceId::new("n"), &BindingIndex::new()).unwrap();
    assert!(effective.is_empty());
    assert_eq!(effective.target(), &WorkspaceId::new("n"));
}

#[test]
fn test_removed_ancestor_binding_disappears_after_rebuild() {
    let records = vec![
        WorkspaceRecord::root("root", "Default"),
        WorkspaceRecord::child("a", "root", "A"),
        WorkspaceRecord::child("b", "a", "B"),
    ];
    let only = binding("viewer", "ops", "a");
    let mut index = BindingIndex::from_bindings([only.clone()]);

    let tree = build_tree(&records).unwrap();
    let before = resolve_effective(&tree, &WorkspaceId::new("b"), &index).unwrap();
    assert_eq!(before.len(), 1);

    assert!(index.remove(&only));
    let rebuilt = build_tree(&records).unwrap();
    let after = resolve_effective(&rebuilt, &WorkspaceId::new("b"), &index).unwrap();
    assert!(after.is_empty());
}

#[test]
fn test_effective_serializes_camel_case() {
    let tree = chain_tree();
    let index = BindingIndex::from_bindings([binding("viewer", "ops", "root")]);
    let effective = resolve_effective(&tree, &WorkspaceId::new("a"), &index).unwrap();

    let json = serde_json::to_value(effective.as_slice()).unwrap();
    assert_eq!(json[0]["roleId"], "viewer");
    assert_eq!(json[0]["sourceWorkspaceId"], "root");
    assert_eq!(json[0]["isInherited"], true);
    assert_eq!(json[0]["subjectType"], "group");
}
