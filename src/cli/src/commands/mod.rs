//! CLI command implementations.

pub mod effective;
pub mod tree;
pub mod validate;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

use wsaccess_core::config::Config;
use wsaccess_core::store::SelectionStore;
use wsaccess_core::sync::{InMemorySource, RefreshOutcome, WorkspaceSync};

/// Read a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `source` into a fresh store and sync service.
pub async fn load(source: InMemorySource, config: &Config) -> Result<WorkspaceSync> {
    let sync = WorkspaceSync::from_source(Arc::new(SelectionStore::new()), Arc::new(source))
        .with_sync_config(config.sync.clone())
        .with_access_config(config.access.clone());

    match sync.refresh().await? {
        RefreshOutcome::Applied { .. } => Ok(sync),
        outcome => anyhow::bail!("Workspace records could not be loaded ({:?})", outcome),
    }
}
