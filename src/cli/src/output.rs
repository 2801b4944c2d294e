//! Output formatting utilities for the wsaccess CLI.
//!
//! Supports table, JSON, and YAML output formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use wsaccess_core::workspace::TreeView;

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Render as a formatted table or outline
    #[default]
    Table,
    /// Render as JSON
    Json,
    /// Render as YAML
    Yaml,
}

/// Print a success message to stdout.
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Print an informational message to stdout.
pub fn print_info(msg: &str) {
    println!("{} {}", "[INFO]".blue().bold(), msg);
}

/// Print a list of items in the requested format.
///
/// For table output, items must implement `Tabled`. For JSON/YAML, items must
/// implement `Serialize`.
pub fn print_list<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No results found.".dimmed());
                return Ok(());
            }
            let table = Table::new(items)
                .with(Style::rounded())
                .with(Modify::new(Columns::first()).with(Alignment::left()))
                .to_string();
            println!("{}", table);
        }
        OutputFormat::Json | OutputFormat::Yaml => print_item(&items, format)?,
    }
    Ok(())
}

/// Print a single item as JSON (also used for table output) or YAML.
pub fn print_item<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(item)?);
        }
    }
    Ok(())
}

/// Print key-value details to the terminal (non-JSON/YAML output).
pub fn print_detail(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Render a view as an indented outline.
///
/// Ancestors kept only for path context are dimmed and tagged.
pub fn render_outline(view: &TreeView) -> String {
    let Some(tree) = view.tree() else {
        return "No matching workspaces.".dimmed().to_string();
    };

    let mut out = String::new();
    for (_, node) in tree.iter() {
        let indent = "  ".repeat(node.depth());
        let line = if view.is_passthrough(node.id()) {
            format!(
                "{}{} {} {}",
                indent,
                node.name().dimmed(),
                format!("({})", node.id()).dimmed(),
                "[path]".dimmed().italic()
            )
        } else {
            format!(
                "{}{} {}",
                indent,
                node.name().bold(),
                format!("({})", node.id()).cyan()
            )
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wsaccess_core::workspace::{build_tree, filter_tree, WorkspaceRecord};

    #[test]
    fn test_outline_marks_passthrough() {
        colored::control::set_override(false);
        let tree = Arc::new(
            build_tree(&[
                WorkspaceRecord::root("root", "Default"),
                WorkspaceRecord::child("ws-1", "root", "Production"),
                WorkspaceRecord::child("ws-2", "root", "Development"),
            ])
            .unwrap(),
        );

        let outline = render_outline(&filter_tree(&tree, "prod"));
        assert_eq!(outline, "Default (root) [path]\n  Production (ws-1)\n");

        let none = render_outline(&filter_tree(&tree, "zzz"));
        assert_eq!(none, "No matching workspaces.");
    }
}
