//! Role-binding inheritance across the workspace hierarchy.
//!
//! Effective bindings for a workspace are the concatenation, root first, of
//! the bindings anchored at every workspace on its ancestor chain, the target
//! included. Nothing is shadowed: a binding at a descendant never removes or
//! narrows one inherited from above.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use super::models::{EffectiveBinding, RoleBinding, RoleId, SubjectId, WorkspaceId};
use super::tree::{NodeIndex, WorkspaceTree};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Workspace not found in tree: {0}")]
    UnknownWorkspace(WorkspaceId),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Binding Index
// ═══════════════════════════════════════════════════════════════════════════════

/// Role bindings grouped by the workspace they are anchored to.
///
/// Input order is kept within each workspace; exact duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingIndex {
    by_workspace: HashMap<WorkspaceId, Vec<RoleBinding>>,
}

impl BindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: impl IntoIterator<Item = RoleBinding>) -> Self {
        let mut index = Self::new();
        for binding in bindings {
            index.insert(binding);
        }
        index
    }

    /// Add a binding. Returns `false` if an identical one was already present.
    pub fn insert(&mut self, binding: RoleBinding) -> bool {
        let slot = self
            .by_workspace
            .entry(binding.workspace_id.clone())
            .or_default();
        if slot.contains(&binding) {
            return false;
        }
        slot.push(binding);
        true
    }

    /// Remove a binding. Returns `false` if it was not present.
    pub fn remove(&mut self, binding: &RoleBinding) -> bool {
        let Some(slot) = self.by_workspace.get_mut(&binding.workspace_id) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|b| b != binding);
        let removed = slot.len() != before;
        if slot.is_empty() {
            self.by_workspace.remove(&binding.workspace_id);
        }
        removed
    }

    /// Bindings anchored directly at `workspace_id`.
    pub fn bindings_for(&self, workspace_id: &WorkspaceId) -> &[RoleBinding] {
        self.by_workspace
            .get(workspace_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of bindings across all workspaces.
    pub fn len(&self) -> usize {
        self.by_workspace.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_workspace.is_empty()
    }
}

impl FromIterator<RoleBinding> for BindingIndex {
    fn from_iter<T: IntoIterator<Item = RoleBinding>>(iter: T) -> Self {
        Self::from_bindings(iter)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Effective Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered effective bindings for one target workspace, root-most first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveBindings {
    target: WorkspaceId,
    bindings: Vec<EffectiveBinding>,
}

impl EffectiveBindings {
    pub fn target(&self) -> &WorkspaceId {
        &self.target
    }

    pub fn as_slice(&self) -> &[EffectiveBinding] {
        &self.bindings
    }

    pub fn into_vec(self) -> Vec<EffectiveBinding> {
        self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EffectiveBinding> {
        self.bindings.iter()
    }

    /// Bindings anchored at the target itself.
    pub fn direct(&self) -> impl Iterator<Item = &EffectiveBinding> + '_ {
        self.bindings.iter().filter(|b| !b.is_inherited)
    }

    /// Bindings inherited from ancestors.
    pub fn inherited(&self) -> impl Iterator<Item = &EffectiveBinding> + '_ {
        self.bindings.iter().filter(|b| b.is_inherited)
    }

    pub fn for_subject<'a>(
        &'a self,
        subject_id: &'a SubjectId,
    ) -> impl Iterator<Item = &'a EffectiveBinding> + 'a {
        self.bindings
            .iter()
            .filter(move |b| &b.subject_id == subject_id)
    }

    /// Distinct role ids in first-seen order.
    pub fn role_ids(&self) -> Vec<&RoleId> {
        let mut seen = HashSet::new();
        self.bindings
            .iter()
            .map(|b| &b.role_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl<'a> IntoIterator for &'a EffectiveBindings {
    type Item = &'a EffectiveBinding;
    type IntoIter = std::slice::Iter<'a, EffectiveBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve the effective bindings of the workspace `target`.
pub fn resolve_effective(
    tree: &WorkspaceTree,
    target: &WorkspaceId,
    index: &BindingIndex,
) -> Result<EffectiveBindings, ResolveError> {
    let idx = tree
        .find(target)
        .ok_or_else(|| ResolveError::UnknownWorkspace(target.clone()))?;
    resolve_effective_at(tree, idx, index)
        .ok_or_else(|| ResolveError::UnknownWorkspace(target.clone()))
}

/// Resolve the effective bindings of the node at `idx`.
///
/// Returns `None` when `idx` is out of range for `tree`. Indices are only
/// meaningful for the tree that issued them; a pruned view numbers its nodes
/// differently from its source.
pub fn resolve_effective_at(
    tree: &WorkspaceTree,
    idx: NodeIndex,
    index: &BindingIndex,
) -> Option<EffectiveBindings> {
    let target = tree.get(idx)?.id().clone();
    let chain = tree.ancestors(idx);

    let bindings: Vec<EffectiveBinding> = chain
        .iter()
        .flat_map(|&node| index.bindings_for(tree[node].id()))
        .map(|binding| EffectiveBinding::from_binding(binding, &target))
        .collect();

    debug!(
        target = %target,
        depth = chain.len(),
        bindings = bindings.len(),
        "Resolved effective bindings"
    );

    Some(EffectiveBindings { target, bindings })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
