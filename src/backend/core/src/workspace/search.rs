//! Case-insensitive name search over a workspace tree.

use std::sync::Arc;

use super::models::WorkspaceRecord;
use super::tree::WorkspaceTree;
use super::view::TreeView;

/// A normalized, non-empty search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    needle: String,
}

impl SearchTerm {
    /// Normalize a raw term. Returns `None` for an empty or blank term.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                needle: trimmed.to_lowercase(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Substring match against the workspace name, ignoring case.
    pub fn matches(&self, record: &WorkspaceRecord) -> bool {
        record.name.to_lowercase().contains(&self.needle)
    }
}

/// Prune `tree` to the nodes whose name contains `term`, keeping their ancestors.
///
/// An empty term returns a view over the very same `Arc`.
pub fn filter_tree(tree: &Arc<WorkspaceTree>, term: &str) -> TreeView {
    TreeView::new(Arc::clone(tree)).search(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_terms_are_not_searches() {
        assert!(SearchTerm::parse("").is_none());
        assert!(SearchTerm::parse("   \t").is_none());
    }

    #[test]
    fn test_match_ignores_case_and_padding() {
        let term = SearchTerm::parse("  PROD ").unwrap();
        assert_eq!(term.as_str(), "prod");
        assert!(term.matches(&WorkspaceRecord::child("ws-1", "root", "Production")));
        assert!(term.matches(&WorkspaceRecord::child("ws-3", "root", "pre-prod")));
        assert!(!term.matches(&WorkspaceRecord::child("ws-2", "root", "Development")));
    }

    #[test]
    fn test_match_uses_name_not_id() {
        let term = SearchTerm::parse("ws-1").unwrap();
        assert!(!term.matches(&WorkspaceRecord::child("ws-1", "root", "Production")));
    }
}
