//! Effective role bindings of one workspace.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use wsaccess_core::config::Config;
use wsaccess_core::sync::InMemorySource;
use wsaccess_core::workspace::{EffectiveBinding, RoleBinding, WorkspaceId, WorkspaceRecord};

use super::{load, read_json};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct EffectiveArgs {
    /// JSON file with the workspace records
    #[arg(short, long)]
    pub records: PathBuf,

    /// JSON file with the role bindings
    #[arg(short, long)]
    pub bindings: PathBuf,

    /// Target workspace id
    #[arg(short, long)]
    pub workspace: String,
}

#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct BindingRow {
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Type")]
    subject_type: String,
    #[tabled(rename = "Source")]
    source_workspace_id: String,
    #[tabled(rename = "Inherited")]
    inherited: String,
}

impl From<&EffectiveBinding> for BindingRow {
    fn from(b: &EffectiveBinding) -> Self {
        Self {
            role: format!("{} ({})", b.role_name, b.role_id),
            subject: b.subject_id.to_string(),
            subject_type: b.subject_type.to_string(),
            source_workspace_id: b.source_workspace_id.to_string(),
            inherited: if b.is_inherited { "yes" } else { "direct" }.to_string(),
        }
    }
}

pub async fn execute(args: EffectiveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let records: Vec<WorkspaceRecord> = read_json(&args.records)?;
    let bindings: Vec<RoleBinding> = read_json(&args.bindings)?;

    let sync = load(InMemorySource::new(records).with_bindings(bindings), config).await?;
    let effective = sync
        .effective_bindings(&WorkspaceId::new(args.workspace))
        .await?;

    match format {
        OutputFormat::Table => {
            let rows: Vec<BindingRow> = effective.iter().map(BindingRow::from).collect();
            output::print_list(&rows, format)?;
        }
        _ => output::print_item(effective.as_slice(), format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsaccess_core::workspace::SubjectType;

    #[test]
    fn test_binding_row_cells_are_plain_text() {
        let binding = RoleBinding::new("viewer", "Viewer", "ops", SubjectType::Group, "root");
        let inherited = EffectiveBinding::from_binding(&binding, &WorkspaceId::new("ws-1"));
        let direct = EffectiveBinding::from_binding(&binding, &WorkspaceId::new("root"));

        let inherited = BindingRow::from(&inherited);
        let direct = BindingRow::from(&direct);

        assert_eq!(inherited.inherited, "yes");
        assert_eq!(direct.inherited, "direct");
    }
}
