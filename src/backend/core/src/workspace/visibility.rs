//! Permission-based visibility of workspaces.
//!
//! The caller's permission set arrives as a list of grants, each naming a
//! permission string (`application:resource:verb`) and optionally a list of
//! resource definitions that narrow it to specific workspace ids.
//!
//! A workspace is directly visible when the caller holds:
//! - an unscoped `read` or `write` grant on the workspace resource, or
//! - a scoped `read` grant whose attribute filter lists the workspace id.
//!
//! Ancestors of visible workspaces stay in a restricted tree but are only
//! passthrough nodes; see [`TreeView::is_selectable`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::WorkspaceId;
use super::tree::WorkspaceTree;
use super::view::TreeView;

const WILDCARD: &str = "*";

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed permission '{0}': expected application:resource:verb")]
pub struct PermissionParseError(pub String);

/// A parsed `application:resource:verb` permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub application: String,
    pub resource: String,
    pub verb: String,
}

impl Permission {
    pub fn new(
        application: impl Into<String>,
        resource: impl Into<String>,
        verb: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            resource: resource.into(),
            verb: verb.into(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, PermissionParseError> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [app, resource, verb] if !app.is_empty() && !resource.is_empty() && !verb.is_empty() => {
                Ok(Self::new(*app, *resource, *verb))
            }
            _ => Err(PermissionParseError(s.to_string())),
        }
    }

    /// Check whether this (possibly wildcarded) grant covers `required`.
    pub fn covers(&self, required: &Permission) -> bool {
        fn part(granted: &str, wanted: &str) -> bool {
            granted == WILDCARD || granted == wanted
        }
        part(&self.application, &required.application)
            && part(&self.resource, &required.resource)
            && part(&self.verb, &required.verb)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.application, self.resource, self.verb)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Grants (wire format)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub attribute_filter: AttributeFilter,
}

/// One entry of the caller's permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub permission: String,
    #[serde(default)]
    pub resource_definitions: Vec<ResourceDefinition>,
}

impl PermissionGrant {
    pub fn unscoped(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            resource_definitions: Vec::new(),
        }
    }

    pub fn scoped<I, S>(permission: impl Into<String>, workspace_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permission: permission.into(),
            resource_definitions: vec![ResourceDefinition {
                attribute_filter: AttributeFilter {
                    key: "group.id".to_string(),
                    operation: "in".to_string(),
                    value: workspace_ids.into_iter().map(Into::into).collect(),
                },
            }],
        }
    }

    pub fn is_scoped(&self) -> bool {
        !self.resource_definitions.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// Names the permission namespace that governs workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceScope {
    pub application: String,
    pub resource: String,
}

impl WorkspaceScope {
    pub fn new(application: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            resource: resource.into(),
        }
    }

    fn read(&self) -> Permission {
        Permission::new(&self.application, &self.resource, "read")
    }

    fn write(&self) -> Permission {
        Permission::new(&self.application, &self.resource, "write")
    }
}

impl Default for WorkspaceScope {
    fn default() -> Self {
        Self::new("inventory", "groups")
    }
}

/// Which workspaces a caller may see, derived from their grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityPolicy {
    unrestricted: bool,
    scoped_ids: HashSet<WorkspaceId>,
}

impl VisibilityPolicy {
    /// Policy that sees everything.
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            scoped_ids: HashSet::new(),
        }
    }

    /// Evaluate `grants` against the workspace namespace in `scope`.
    ///
    /// Malformed permission strings are skipped with a warning.
    pub fn from_grants(grants: &[PermissionGrant], scope: &WorkspaceScope) -> Self {
        let read = scope.read();
        let write = scope.write();
        let mut policy = Self::default();

        for grant in grants {
            let permission = match Permission::parse(&grant.permission) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed permission grant");
                    continue;
                }
            };

            if !grant.is_scoped() {
                if permission.covers(&read) || permission.covers(&write) {
                    policy.unrestricted = true;
                }
            } else if permission.covers(&read) {
                policy.scoped_ids.extend(
                    grant
                        .resource_definitions
                        .iter()
                        .flat_map(|def| def.attribute_filter.value.iter())
                        .map(|id| WorkspaceId::new(id.as_str())),
                );
            }
        }

        debug!(
            unrestricted = policy.unrestricted,
            scoped = policy.scoped_ids.len(),
            "Evaluated workspace visibility"
        );
        policy
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub fn is_visible(&self, id: &WorkspaceId) -> bool {
        self.unrestricted || self.scoped_ids.contains(id)
    }
}

/// Restrict `tree` to what `grants` allow, keeping ancestor paths.
pub fn restrict_tree(
    tree: &Arc<WorkspaceTree>,
    grants: &[PermissionGrant],
    scope: &WorkspaceScope,
) -> TreeView {
    let policy = VisibilityPolicy::from_grants(grants, scope);
    TreeView::new(Arc::clone(tree)).restrict(&policy)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
