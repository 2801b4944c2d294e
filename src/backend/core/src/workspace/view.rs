//! Composable filtered views over a workspace tree.
//!
//! A [`TreeView`] keeps the source tree it was derived from and the set of
//! nodes that passed every filter applied so far ("direct" nodes). Each new
//! filter is evaluated against the source tree and intersected with the
//! current direct set before the ancestor closure is taken, so search and
//! visibility compose in any order with the same result.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::models::WorkspaceId;
use super::search::SearchTerm;
use super::tree::{TreeNode, WorkspaceTree};
use super::visibility::VisibilityPolicy;
use crate::telemetry::metrics;

#[derive(Debug, Clone)]
pub struct TreeView {
    source: Arc<WorkspaceTree>,
    /// `None` when filtering left nothing.
    tree: Option<Arc<WorkspaceTree>>,
    /// `None` while no filter has been applied.
    direct: Option<HashSet<WorkspaceId>>,
}

impl TreeView {
    /// Unfiltered view; `tree()` is the same `Arc` as `source`.
    pub fn new(source: Arc<WorkspaceTree>) -> Self {
        Self {
            tree: Some(Arc::clone(&source)),
            source,
            direct: None,
        }
    }

    pub fn source(&self) -> &Arc<WorkspaceTree> {
        &self.source
    }

    /// The pruned tree, or `None` when nothing matched.
    pub fn tree(&self) -> Option<&Arc<WorkspaceTree>> {
        self.tree.as_ref()
    }

    /// Whether any filter has been applied. Distinguishes "no matches" from
    /// "not searched".
    pub fn is_filtered(&self) -> bool {
        self.direct.is_some()
    }

    /// True when filtering left no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    /// Number of nodes in the pruned tree.
    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.len())
    }

    pub fn contains(&self, id: &WorkspaceId) -> bool {
        self.tree.as_ref().is_some_and(|t| t.contains(id))
    }

    /// True for nodes that passed every filter in their own right.
    ///
    /// Ancestors kept only to preserve the path are not selectable.
    pub fn is_selectable(&self, id: &WorkspaceId) -> bool {
        match &self.direct {
            None => self.source.contains(id),
            Some(direct) => direct.contains(id),
        }
    }

    /// True for ancestors present only because a descendant survived.
    pub fn is_passthrough(&self, id: &WorkspaceId) -> bool {
        self.contains(id) && !self.is_selectable(id)
    }

    /// Selectable ids in pre-order.
    pub fn selectable_ids(&self) -> Vec<WorkspaceId> {
        match &self.tree {
            None => Vec::new(),
            Some(tree) => tree
                .ids()
                .filter(|id| self.is_selectable(id))
                .cloned()
                .collect(),
        }
    }

    /// Narrow by a name search. Blank terms leave the view untouched.
    pub fn search(self, term: &str) -> Self {
        match SearchTerm::parse(term) {
            None => self,
            Some(term) => {
                let view = self.narrow(|node| term.matches(node.record()));
                debug!(term = term.as_str(), nodes = view.len(), "Applied workspace search");
                metrics::record_filter("search", view.is_empty());
                view
            }
        }
    }

    /// Narrow to what `policy` allows. An unrestricted policy is the identity.
    pub fn restrict(self, policy: &VisibilityPolicy) -> Self {
        if policy.is_unrestricted() {
            return self;
        }
        let view = self.narrow(|node| policy.is_visible(node.id()));
        debug!(nodes = view.len(), "Applied workspace visibility");
        metrics::record_filter("visibility", view.is_empty());
        view
    }

    fn narrow(self, predicate: impl Fn(&TreeNode) -> bool) -> Self {
        let direct: HashSet<WorkspaceId> = self
            .source
            .iter()
            .filter(|(_, node)| self.is_selectable(node.id()) && predicate(node))
            .map(|(_, node)| node.id().clone())
            .collect();

        let keep = self
            .source
            .ancestor_closure(|_, node| direct.contains(node.id()));
        let tree = self.source.retain(&keep).map(Arc::new);

        Self {
            source: self.source,
            tree,
            direct: Some(direct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::models::WorkspaceRecord;

    fn sample() -> Arc<WorkspaceTree> {
        let records = vec![
            WorkspaceRecord::root("root", "Default"),
            WorkspaceRecord::child("ws-1", "root", "Production"),
            WorkspaceRecord::child("ws-2", "root", "Development"),
            WorkspaceRecord::child("ws-3", "ws-1", "Prod EU"),
        ];
        Arc::new(WorkspaceTree::build(&records).unwrap())
    }

    #[test]
    fn test_unfiltered_view_shares_source() {
        let tree = sample();
        let view = TreeView::new(Arc::clone(&tree));
        assert!(!view.is_filtered());
        assert!(Arc::ptr_eq(view.tree().unwrap(), &tree));
        assert!(view.is_selectable(&WorkspaceId::new("ws-2")));
    }

    #[test]
    fn test_no_matches_is_filtered_and_empty() {
        let view = TreeView::new(sample()).search("staging");
        assert!(view.is_filtered());
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
        assert!(view.selectable_ids().is_empty());
    }

    #[test]
    fn test_passthrough_ancestor_not_selectable() {
        let view = TreeView::new(sample()).search("eu");
        assert!(view.contains(&WorkspaceId::new("ws-1")));
        assert!(view.is_passthrough(&WorkspaceId::new("ws-1")));
        assert!(view.is_passthrough(&WorkspaceId::new("root")));
        assert!(view.is_selectable(&WorkspaceId::new("ws-3")));
        assert_eq!(view.selectable_ids(), vec![WorkspaceId::new("ws-3")]);
    }

    #[test]
    fn test_repeated_search_narrows() {
        let view = TreeView::new(sample()).search("prod").search("eu");
        assert_eq!(view.selectable_ids(), vec![WorkspaceId::new("ws-3")]);
    }
}
