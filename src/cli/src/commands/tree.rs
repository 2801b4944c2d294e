//! Hierarchy display with search and permission filtering.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use wsaccess_core::config::Config;
use wsaccess_core::sync::InMemorySource;
use wsaccess_core::workspace::{PermissionGrant, TreeView, WorkspaceRecord};

use super::{load, read_json};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct TreeArgs {
    /// JSON file with the workspace records
    #[arg(short, long)]
    pub records: PathBuf,

    /// Case-insensitive name search
    #[arg(short, long)]
    pub search: Option<String>,

    /// JSON file with the caller's permission grants (an empty array hides everything); omit to see everything
    #[arg(short, long)]
    pub permissions: Option<PathBuf>,
}

/// One node of the rendered view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeRow {
    id: String,
    name: String,
    parent_id: Option<String>,
    depth: usize,
    selectable: bool,
}

fn rows(view: &TreeView) -> Vec<NodeRow> {
    let Some(tree) = view.tree() else {
        return Vec::new();
    };
    tree.iter()
        .map(|(_, node)| NodeRow {
            id: node.id().to_string(),
            name: node.name().to_string(),
            parent_id: node.parent().map(|p| tree[p].id().to_string()),
            depth: node.depth(),
            selectable: view.is_selectable(node.id()),
        })
        .collect()
}

pub async fn execute(args: TreeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let records: Vec<WorkspaceRecord> = read_json(&args.records)?;
    let mut source = InMemorySource::new(records);
    if let Some(path) = &args.permissions {
        let grants: Vec<PermissionGrant> = read_json(path)?;
        source = source.with_grants(grants);
    }

    let sync = load(source, config).await?;
    let mut view = sync.visible_view().await?;
    if let Some(term) = &args.search {
        view = view.search(term);
    }

    match format {
        OutputFormat::Table => print!("{}", output::render_outline(&view)),
        _ => output::print_item(&rows(&view), format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wsaccess_core::workspace::{build_tree, filter_tree};

    #[test]
    fn test_rows_flag_selectable_nodes() {
        let tree = Arc::new(
            build_tree(&[
                WorkspaceRecord::root("root", "Default"),
                WorkspaceRecord::child("ws-1", "root", "Production"),
            ])
            .unwrap(),
        );
        let rows = rows(&filter_tree(&tree, "prod"));
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].selectable);
        assert_eq!(rows[1].parent_id.as_deref(), Some("root"));
        assert!(rows[1].selectable);
    }
}
