#![allow(clippy::result_large_err)]
//! # Workspace Access Core
//!
//! Workspace hierarchy and effective access resolution.
//!
//! ## Architecture
//!
//! - **Tree Builder**: Validates flat workspace records and assembles an arena tree
//! - **Search & Visibility**: Order-independent filtered views that preserve ancestor paths
//! - **Inheritance**: Root-to-target union of role bindings, no shadowing
//! - **Selection Store**: Observable state with synchronous notification and stale-fetch protection
//! - **Sync**: Async refresh from injected collaborators, periodic or on demand
//! - **Telemetry**: Structured logging and metrics

pub mod config;
pub mod error;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod workspace;

pub use error::{AccessError, ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AccessConfig, Config, SyncConfig};
    pub use crate::error::{AccessError, ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result};
    pub use crate::store::{
        FetchCompletion, FetchOutcome, FetchStatus, FetchTicket, SelectionState, SelectionStore,
        StoreTx, Subscription,
    };
    pub use crate::sync::{
        InMemorySource, PermissionSource, RefreshOutcome, RoleBindingSource, WorkspaceSource,
        WorkspaceSync,
    };
    pub use crate::workspace::{
        build_tree, filter_tree, resolve_effective, restrict_tree, BindingIndex, BuildOptions,
        EffectiveBinding, EffectiveBindings, HierarchyError, NodeIndex, PermissionGrant,
        RoleBinding, RootPolicy, SubjectType, TreeNode, TreeView, VisibilityPolicy, WorkspaceId,
        WorkspaceKind, WorkspaceRecord, WorkspaceScope, WorkspaceTree,
    };
}
