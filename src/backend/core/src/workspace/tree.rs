//! Tree builder: turns a flat list of workspace records into a rooted tree.
//!
//! The tree is stored as an arena of nodes addressed by [`NodeIndex`]. Nodes
//! are laid out in pre-order, so the root is always at index 0 and every
//! parent precedes its children. Parent links are plain indices and never own
//! anything; the arena owns every node.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Index;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{WorkspaceId, WorkspaceRecord};
use crate::telemetry::metrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Reasons a record collection cannot be assembled into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Duplicate workspace id: {id}")]
    DuplicateId { id: WorkspaceId },

    #[error("Workspace {id} references unknown parent {parent_id}")]
    OrphanedNode {
        id: WorkspaceId,
        parent_id: WorkspaceId,
    },

    #[error("Cycle detected in workspace hierarchy at {id}")]
    CyclicHierarchy { id: WorkspaceId },

    #[error("Multiple root workspaces: {first} and {second}")]
    MultipleRoots {
        first: WorkspaceId,
        second: WorkspaceId,
    },

    #[error("No root workspace found")]
    NoRoot,
}

impl HierarchyError {
    /// Short stable label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::OrphanedNode { .. } => "orphaned_node",
            Self::CyclicHierarchy { .. } => "cyclic_hierarchy",
            Self::MultipleRoots { .. } => "multiple_roots",
            Self::NoRoot => "no_root",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Build Options
// ═══════════════════════════════════════════════════════════════════════════════

/// What to do when more than one record has no parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// Reject the collection with [`HierarchyError::MultipleRoots`].
    #[default]
    Strict,
    /// Keep the first root in input order; drop the others and their subtrees.
    FirstWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub root_policy: RootPolicy,
}

impl BuildOptions {
    pub fn with_root_policy(mut self, root_policy: RootPolicy) -> Self {
        self.root_policy = root_policy;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tree
// ═══════════════════════════════════════════════════════════════════════════════

/// Position of a node inside one [`WorkspaceTree`] arena.
///
/// Indices are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A workspace record placed in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    record: WorkspaceRecord,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    depth: usize,
}

impl TreeNode {
    pub fn record(&self) -> &WorkspaceRecord {
        &self.record
    }

    pub fn id(&self) -> &WorkspaceId {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Non-owning link to the parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Children ordered by case-insensitive name, then id.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An immutable, rooted workspace hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTree {
    nodes: Vec<TreeNode>,
    by_id: HashMap<WorkspaceId, NodeIndex>,
}

impl WorkspaceTree {
    /// Build a tree with the default (strict) options.
    pub fn build(records: &[WorkspaceRecord]) -> Result<Self, HierarchyError> {
        Self::build_with(records, BuildOptions::default())
    }

    /// Build a tree from flat records.
    ///
    /// Validation runs in the order duplicates, orphans, cycles, roots. Once
    /// every parent reference resolves and no cycle exists, a non-empty input
    /// always contains at least one root.
    pub fn build_with(
        records: &[WorkspaceRecord],
        options: BuildOptions,
    ) -> Result<Self, HierarchyError> {
        let result = assemble(records, options);
        match &result {
            Ok(tree) => {
                debug!(nodes = tree.len(), "Built workspace tree");
                metrics::record_tree_built(tree.len());
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), records = records.len(), "Failed to build workspace tree");
                metrics::record_tree_build_failed(e.kind());
            }
        }
        result
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(idx.0)
    }

    pub fn find(&self, id: &WorkspaceId) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn get_by_id(&self, id: &WorkspaceId) -> Option<&TreeNode> {
        self.find(id).map(|idx| &self.nodes[idx.0])
    }

    pub fn contains(&self, id: &WorkspaceId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.get(idx).and_then(TreeNode::parent)
    }

    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.get(idx).map(TreeNode::children).unwrap_or(&[])
    }

    /// The chain from the root down to `idx`, both inclusive.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut cursor = self.get(idx).map(|_| idx);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.nodes[current.0].parent;
        }
        chain.reverse();
        chain
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in pre-order (root first, siblings in display order).
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &TreeNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkspaceId> + '_ {
        self.nodes.iter().map(TreeNode::id)
    }

    /// Mark every node for which `direct` holds, plus all of its ancestors.
    pub(crate) fn ancestor_closure(&self, direct: impl Fn(NodeIndex, &TreeNode) -> bool) -> Vec<bool> {
        let mut keep = vec![false; self.nodes.len()];
        // Pre-order layout: walking backwards visits children before parents.
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            if !keep[i] && direct(NodeIndex(i), node) {
                keep[i] = true;
            }
            if keep[i] {
                if let Some(parent) = node.parent {
                    keep[parent.0] = true;
                }
            }
        }
        keep
    }

    /// Copy the nodes flagged in `keep` into a fresh tree.
    ///
    /// `keep` must be closed under "parent of a kept node is kept". Returns
    /// `None` when the root is not kept.
    pub(crate) fn retain(&self, keep: &[bool]) -> Option<WorkspaceTree> {
        if !keep.first().copied().unwrap_or(false) {
            return None;
        }

        let mut remap: Vec<Option<NodeIndex>> = vec![None; self.nodes.len()];
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut by_id = HashMap::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            let parent = match node.parent {
                Some(p) => Some(remap[p.0]?),
                None => None,
            };
            let new_idx = NodeIndex(nodes.len());
            remap[i] = Some(new_idx);
            if let Some(p) = parent {
                nodes[p.0].children.push(new_idx);
            }
            by_id.insert(node.record.id.clone(), new_idx);
            nodes.push(TreeNode {
                record: node.record.clone(),
                parent,
                children: Vec::new(),
                depth: node.depth,
            });
        }

        Some(WorkspaceTree { nodes, by_id })
    }
}

impl Index<NodeIndex> for WorkspaceTree {
    type Output = TreeNode;

    fn index(&self, idx: NodeIndex) -> &Self::Output {
        &self.nodes[idx.0]
    }
}

/// Build a tree with default options.
pub fn build_tree(records: &[WorkspaceRecord]) -> Result<WorkspaceTree, HierarchyError> {
    WorkspaceTree::build(records)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Assembly
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

fn assemble(records: &[WorkspaceRecord], options: BuildOptions) -> Result<WorkspaceTree, HierarchyError> {
    // 1. Index by id.
    let mut position: HashMap<&WorkspaceId, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if position.insert(&record.id, i).is_some() {
            return Err(HierarchyError::DuplicateId {
                id: record.id.clone(),
            });
        }
    }

    // 2. Resolve parent references.
    let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(records.len());
    for record in records {
        match &record.parent_id {
            None => parent_of.push(None),
            Some(parent_id) => match position.get(parent_id) {
                Some(&p) => parent_of.push(Some(p)),
                None => {
                    return Err(HierarchyError::OrphanedNode {
                        id: record.id.clone(),
                        parent_id: parent_id.clone(),
                    })
                }
            },
        }
    }

    // 3. Walk every parent chain once; re-entering a chain still in progress is a cycle.
    let mut state = vec![Visit::Unvisited; records.len()];
    let mut path = Vec::new();
    for start in 0..records.len() {
        let mut cursor = Some(start);
        while let Some(current) = cursor {
            match state[current] {
                Visit::Done => break,
                Visit::InProgress => {
                    return Err(HierarchyError::CyclicHierarchy {
                        id: records[current].id.clone(),
                    })
                }
                Visit::Unvisited => {
                    state[current] = Visit::InProgress;
                    path.push(current);
                    cursor = parent_of[current];
                }
            }
        }
        for visited in path.drain(..) {
            state[visited] = Visit::Done;
        }
    }

    // 4. Pick the root.
    let roots: Vec<usize> = (0..records.len()).filter(|&i| parent_of[i].is_none()).collect();
    let root = match roots.as_slice() {
        [] => return Err(HierarchyError::NoRoot),
        [only] => *only,
        [first, second, ..] => match options.root_policy {
            RootPolicy::Strict => {
                return Err(HierarchyError::MultipleRoots {
                    first: records[*first].id.clone(),
                    second: records[*second].id.clone(),
                })
            }
            RootPolicy::FirstWins => {
                warn!(
                    root = %records[*first].id,
                    extra_roots = roots.len() - 1,
                    "Multiple root workspaces; keeping the first"
                );
                *first
            }
        },
    };

    // 5. Children lists, sorted by case-insensitive name then id.
    let sort_keys: Vec<String> = records.iter().map(|r| r.name.to_lowercase()).collect();
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children_of[*p].push(i);
        }
    }
    for children in &mut children_of {
        children.sort_by(|&a, &b| {
            sort_keys[a]
                .cmp(&sort_keys[b])
                .then_with(|| records[a].id.cmp(&records[b].id))
        });
    }

    // 6. Lay out the arena in pre-order from the root.
    let mut nodes: Vec<TreeNode> = Vec::with_capacity(records.len());
    let mut by_id = HashMap::with_capacity(records.len());
    let mut stack: Vec<(usize, Option<NodeIndex>, usize)> = vec![(root, None, 0)];
    while let Some((i, parent, depth)) = stack.pop() {
        let idx = NodeIndex(nodes.len());
        if let Some(p) = parent {
            nodes[p.0].children.push(idx);
        }
        by_id.insert(records[i].id.clone(), idx);
        nodes.push(TreeNode {
            record: records[i].clone(),
            parent,
            children: Vec::new(),
            depth,
        });
        for &child in children_of[i].iter().rev() {
            stack.push((child, Some(idx), depth + 1));
        }
    }

    let dropped = records.len() - nodes.len();
    if dropped > 0 {
        warn!(dropped, "Dropped workspaces not reachable from the root");
    }

    Ok(WorkspaceTree { nodes, by_id })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
