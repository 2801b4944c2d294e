//! Workspace hierarchy and effective access resolution.
//!
//! This module provides:
//! - **Models**: workspace records, role bindings, effective bindings
//! - **Tree Builder**: assembles flat records into an arena-backed tree
//! - **Search**: case-insensitive name search that keeps ancestor paths
//! - **Visibility**: restricts a tree to what the caller's grants allow
//! - **Views**: order-independent composition of search and visibility
//! - **Inheritance**: root-to-target union of role bindings
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use wsaccess_core::workspace::{
//!     build_tree, filter_tree, resolve_effective, BindingIndex, RoleBinding,
//!     SubjectType, WorkspaceId, WorkspaceRecord,
//! };
//!
//! let tree = Arc::new(build_tree(&[
//!     WorkspaceRecord::root("root", "Default"),
//!     WorkspaceRecord::child("ws-1", "root", "Production"),
//! ])?);
//!
//! let view = filter_tree(&tree, "prod");
//! assert!(view.is_selectable(&WorkspaceId::new("ws-1")));
//!
//! let index = BindingIndex::from_bindings([RoleBinding::new(
//!     "viewer", "Viewer", "ops", SubjectType::Group, "root",
//! )]);
//! let effective = resolve_effective(&tree, &WorkspaceId::new("ws-1"), &index)?;
//! assert!(effective.as_slice()[0].is_inherited);
//! # Ok::<(), wsaccess_core::AccessError>(())
//! ```

pub mod inheritance;
pub mod models;
pub mod search;
pub mod tree;
pub mod view;
pub mod visibility;

pub use inheritance::{
    resolve_effective, resolve_effective_at, BindingIndex, EffectiveBindings, ResolveError,
};
pub use models::{
    EffectiveBinding, RoleBinding, RoleId, SubjectId, SubjectType, WorkspaceId, WorkspaceKind,
    WorkspaceRecord,
};
pub use search::{filter_tree, SearchTerm};
pub use tree::{
    build_tree, BuildOptions, HierarchyError, NodeIndex, RootPolicy, TreeNode, WorkspaceTree,
};
pub use view::TreeView;
pub use visibility::{
    restrict_tree, AttributeFilter, Permission, PermissionGrant, PermissionParseError,
    ResourceDefinition, VisibilityPolicy, WorkspaceScope,
};
