//! Workspace data models: records, role bindings, and effective bindings.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }
    };
}

string_id!(
    /// Strongly-typed workspace identifier.
    WorkspaceId
);

string_id!(
    /// Strongly-typed role identifier.
    RoleId
);

string_id!(
    /// Identifier of the user or group a role is bound to.
    SubjectId
);

// ═══════════════════════════════════════════════════════════════════════════════
// Workspace Record
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of workspace as reported by the listing collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    Root,
    #[default]
    Standard,
}

/// A flat workspace record as delivered by the listing collaborator.
///
/// Exactly one record per tenant carries `parent_id = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<WorkspaceId>,
    #[serde(default)]
    pub kind: WorkspaceKind,
}

impl WorkspaceRecord {
    /// Create a root record (no parent).
    pub fn root(id: impl Into<WorkspaceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parent_id: None,
            kind: WorkspaceKind::Root,
        }
    }

    /// Create a standard record attached to `parent_id`.
    pub fn child(
        id: impl Into<WorkspaceId>,
        parent_id: impl Into<WorkspaceId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parent_id: Some(parent_id.into()),
            kind: WorkspaceKind::Standard,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of subject a role is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    User,
    Group,
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// Binds a role to a subject at exactly one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub role_id: RoleId,
    pub role_name: String,
    pub subject_id: SubjectId,
    pub subject_type: SubjectType,
    pub workspace_id: WorkspaceId,
}

impl RoleBinding {
    pub fn new(
        role_id: impl Into<RoleId>,
        role_name: impl Into<String>,
        subject_id: impl Into<SubjectId>,
        subject_type: SubjectType,
        workspace_id: impl Into<WorkspaceId>,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            role_name: role_name.into(),
            subject_id: subject_id.into(),
            subject_type,
            workspace_id: workspace_id.into(),
        }
    }
}

/// A role binding as it applies to a target workspace after inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBinding {
    pub role_id: RoleId,
    pub role_name: String,
    pub subject_id: SubjectId,
    pub subject_type: SubjectType,
    /// Workspace the binding is anchored to.
    pub source_workspace_id: WorkspaceId,
    /// True whenever `source_workspace_id` differs from the target.
    pub is_inherited: bool,
}

impl EffectiveBinding {
    /// Tag `binding` relative to `target`.
    pub fn from_binding(binding: &RoleBinding, target: &WorkspaceId) -> Self {
        Self {
            role_id: binding.role_id.clone(),
            role_name: binding.role_name.clone(),
            subject_id: binding.subject_id.clone(),
            subject_type: binding.subject_type,
            source_workspace_id: binding.workspace_id.clone(),
            is_inherited: &binding.workspace_id != target,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let json = r#"{"id":"ws-1","name":"Production","description":"","parentId":"root","kind":"standard"}"#;
        let record: WorkspaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "ws-1");
        assert_eq!(record.parent_id, Some(WorkspaceId::new("root")));
        assert_eq!(record.kind, WorkspaceKind::Standard);
        assert!(!record.is_root());
    }

    #[test]
    fn test_record_null_parent_is_root() {
        let json = r#"{"id":"root","name":"Default","parentId":null,"kind":"root"}"#;
        let record: WorkspaceRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_root());
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_binding_wire_format() {
        let binding = RoleBinding::new("viewer", "Viewer", "alice", SubjectType::User, "root");
        let value = serde_json::to_value(&binding).unwrap();
        assert_eq!(value["roleId"], "viewer");
        assert_eq!(value["subjectType"], "user");
        assert_eq!(value["workspaceId"], "root");
    }

    #[test]
    fn test_effective_binding_inherited_flag() {
        let binding = RoleBinding::new("viewer", "Viewer", "ops", SubjectType::Group, "root");

        let at_root = EffectiveBinding::from_binding(&binding, &WorkspaceId::new("root"));
        assert!(!at_root.is_inherited);

        let at_child = EffectiveBinding::from_binding(&binding, &WorkspaceId::new("ws-1"));
        assert!(at_child.is_inherited);
        assert_eq!(at_child.source_workspace_id.as_str(), "root");
    }
}
