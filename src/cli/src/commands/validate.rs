//! Hierarchy validation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use wsaccess_core::config::Config;
use wsaccess_core::workspace::{WorkspaceRecord, WorkspaceTree};
use wsaccess_core::AccessError;

use super::read_json;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON file with the workspace records
    #[arg(short, long)]
    pub records: PathBuf,
}

#[derive(Serialize)]
struct ValidationReport {
    records: usize,
    workspaces: usize,
    depth: usize,
    root: String,
}

pub fn execute(args: ValidateArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let records: Vec<WorkspaceRecord> = read_json(&args.records)?;
    let tree = WorkspaceTree::build_with(&records, config.access.build_options())
        .map_err(AccessError::from)?;

    let report = ValidationReport {
        records: records.len(),
        workspaces: tree.len(),
        depth: tree.iter().map(|(_, node)| node.depth()).max().unwrap_or(0),
        root: tree.root_node().id().to_string(),
    };

    match format {
        OutputFormat::Table => {
            output::print_success("Workspace hierarchy is valid");
            output::print_detail("Root", &report.root);
            output::print_detail("Workspaces", &report.workspaces.to_string());
            output::print_detail("Depth", &report.depth.to_string());
            if report.workspaces < report.records {
                output::print_info(&format!(
                    "{} record(s) not reachable from the root were dropped",
                    report.records - report.workspaces
                ));
            }
        }
        _ => output::print_item(&report, format)?,
    }
    Ok(())
}
