//! Fetching workspace data from collaborators and feeding the store.
//!
//! The engine never talks to a transport itself. Workspace records, role
//! bindings and the caller's permissions come from injected sources;
//! [`WorkspaceSync`] sequences fetches through the [`SelectionStore`] so a
//! slow, stale response can never overwrite a fresher one.

use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{AccessConfig, SyncConfig};
use crate::error::{AccessError, ErrorCode, Result};
use crate::store::{FetchCompletion, FetchOutcome, SelectionStore};
use crate::telemetry::RefreshTimer;
use crate::workspace::{
    resolve_effective_at, BindingIndex, EffectiveBindings, PermissionGrant, RoleBinding, TreeView,
    VisibilityPolicy, WorkspaceId, WorkspaceRecord, WorkspaceTree,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborators
// ═══════════════════════════════════════════════════════════════════════════════

/// Supplies the tenant's workspace records.
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceRecord>>;
}

/// Supplies the role bindings anchored at one workspace.
#[async_trait]
pub trait RoleBindingSource: Send + Sync {
    async fn list_bindings(&self, workspace_id: &WorkspaceId) -> Result<Vec<RoleBinding>>;
}

/// Supplies the caller's current permission set.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn permissions(&self) -> Result<Vec<PermissionGrant>>;
}

/// Source backed by values held in memory.
///
/// Used for loaded export files and in tests.
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: RwLock<Vec<WorkspaceRecord>>,
    bindings: RwLock<Vec<RoleBinding>>,
    /// `None` until grants are supplied; the caller is then unrestricted.
    grants: RwLock<Option<Vec<PermissionGrant>>>,
}

impl InMemorySource {
    pub fn new(records: Vec<WorkspaceRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    pub fn with_bindings(self, bindings: Vec<RoleBinding>) -> Self {
        *self.bindings.write() = bindings;
        self
    }

    /// Restrict the caller to `grants`. An empty list hides every workspace;
    /// a source that never receives grants leaves the caller unrestricted.
    pub fn with_grants(self, grants: Vec<PermissionGrant>) -> Self {
        *self.grants.write() = Some(grants);
        self
    }

    pub fn set_records(&self, records: Vec<WorkspaceRecord>) {
        *self.records.write() = records;
    }

    pub fn set_bindings(&self, bindings: Vec<RoleBinding>) {
        *self.bindings.write() = bindings;
    }

    pub fn set_grants(&self, grants: Vec<PermissionGrant>) {
        *self.grants.write() = Some(grants);
    }

    /// Forget any supplied grants, making the caller unrestricted again.
    pub fn clear_grants(&self) {
        *self.grants.write() = None;
    }
}

#[async_trait]
impl WorkspaceSource for InMemorySource {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceRecord>> {
        Ok(self.records.read().clone())
    }
}

#[async_trait]
impl RoleBindingSource for InMemorySource {
    async fn list_bindings(&self, workspace_id: &WorkspaceId) -> Result<Vec<RoleBinding>> {
        Ok(self
            .bindings
            .read()
            .iter()
            .filter(|b| &b.workspace_id == workspace_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PermissionSource for InMemorySource {
    async fn permissions(&self) -> Result<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .read()
            .clone()
            .unwrap_or_else(|| vec![PermissionGrant::unscoped("*:*:*")]))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sync Service
// ═══════════════════════════════════════════════════════════════════════════════

/// What one call to [`WorkspaceSync::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new tree was applied to the store.
    Applied { nodes: usize },
    /// The fetch failed; the store keeps its previous tree and flags the error.
    FetchFailed,
    /// A newer refresh finished first; this result was discarded.
    Stale,
}

/// Drives fetches from the collaborators into a [`SelectionStore`].
pub struct WorkspaceSync {
    store: Arc<SelectionStore>,
    workspaces: Arc<dyn WorkspaceSource>,
    bindings: Arc<dyn RoleBindingSource>,
    permissions: Arc<dyn PermissionSource>,
    sync: SyncConfig,
    access: AccessConfig,
}

impl WorkspaceSync {
    pub fn new(
        store: Arc<SelectionStore>,
        workspaces: Arc<dyn WorkspaceSource>,
        bindings: Arc<dyn RoleBindingSource>,
        permissions: Arc<dyn PermissionSource>,
    ) -> Self {
        Self {
            store,
            workspaces,
            bindings,
            permissions,
            sync: SyncConfig::default(),
            access: AccessConfig::default(),
        }
    }

    /// Use one value for all three collaborators.
    pub fn from_source<S>(store: Arc<SelectionStore>, source: Arc<S>) -> Self
    where
        S: WorkspaceSource + RoleBindingSource + PermissionSource + 'static,
    {
        Self::new(store, source.clone(), source.clone(), source)
    }

    pub fn with_sync_config(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_access_config(mut self, access: AccessConfig) -> Self {
        self.access = access;
        self
    }

    pub fn store(&self) -> &Arc<SelectionStore> {
        &self.store
    }

    /// Fetch the workspace collection once and apply it to the store.
    ///
    /// Fetch failures are absorbed into the store's error flag. A malformed
    /// hierarchy also flags the store, keeps the previous tree, and is
    /// returned to the caller.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let timer = RefreshTimer::start();
        let ticket = self.store.begin_fetch();
        debug!(ticket = ticket.value(), "Refreshing workspaces");

        let records = match self.bounded(self.workspaces.list_workspaces()).await {
            Ok(records) => records,
            Err(e) => {
                e.log();
                warn!(ticket = ticket.value(), error = %e, "Workspace fetch failed");
                let outcome = self.store.complete_fetch(ticket, FetchCompletion::Failed);
                timer.finish("fetch_failed");
                return Ok(match outcome {
                    FetchOutcome::Applied => RefreshOutcome::FetchFailed,
                    FetchOutcome::Stale => RefreshOutcome::Stale,
                });
            }
        };

        let tree = match WorkspaceTree::build_with(&records, self.access.build_options()) {
            Ok(tree) => Arc::new(tree),
            Err(e) => {
                self.store.complete_fetch(ticket, FetchCompletion::Failed);
                timer.finish("malformed");
                let error = AccessError::from(e);
                error.log();
                return Err(error);
            }
        };

        let nodes = tree.len();
        let outcome = match self.store.complete_fetch(ticket, FetchCompletion::Loaded(tree)) {
            FetchOutcome::Applied => {
                info!(nodes, "Workspace tree refreshed");
                timer.finish("applied");
                RefreshOutcome::Applied { nodes }
            }
            FetchOutcome::Stale => {
                timer.finish("stale");
                RefreshOutcome::Stale
            }
        };
        Ok(outcome)
    }

    /// Refresh on the configured interval until `shutdown` turns true or its
    /// sender is dropped.
    pub fn spawn_periodic(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let period = self.sync.refresh_interval;
        let refresh_on_start = self.sync.refresh_on_start;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !refresh_on_start {
                // The first tick completes immediately.
                interval.tick().await;
            }

            info!(interval = ?period, "Periodic workspace refresh started");

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = self.refresh().await {
                            warn!(error = %e, "Periodic refresh rejected the workspace collection");
                        }
                    }
                }
            }

            info!("Periodic workspace refresh stopped");
        })
    }

    /// Effective bindings of `workspace_id` in the current tree snapshot.
    ///
    /// Bindings for every workspace on the ancestor chain are fetched
    /// concurrently; nothing is cached between calls.
    pub async fn effective_bindings(&self, workspace_id: &WorkspaceId) -> Result<EffectiveBindings> {
        let tree = self.current_tree()?;
        let idx = tree
            .find(workspace_id)
            .ok_or_else(|| AccessError::workspace_not_found(workspace_id.as_str()))?;

        let chain: Vec<WorkspaceId> = tree
            .ancestors(idx)
            .into_iter()
            .map(|node| tree[node].id().clone())
            .collect();

        let fetches = chain
            .iter()
            .map(|ws| self.bindings.list_bindings(ws));
        let per_workspace = self.bounded(try_join_all(fetches)).await?;

        let index = BindingIndex::from_bindings(per_workspace.into_iter().flatten());
        resolve_effective_at(&tree, idx, &index)
            .ok_or_else(|| AccessError::workspace_not_found(workspace_id.as_str()))
    }

    /// The current snapshot restricted to what the caller may see.
    pub async fn visible_view(&self) -> Result<TreeView> {
        let tree = self.current_tree()?;
        let grants = self.bounded(self.permissions.permissions()).await?;
        let policy = VisibilityPolicy::from_grants(&grants, &self.access.scope());
        Ok(TreeView::new(tree).restrict(&policy))
    }

    fn current_tree(&self) -> Result<Arc<WorkspaceTree>> {
        self.store.tree().ok_or_else(|| {
            AccessError::new(ErrorCode::WorkspaceNotFound, "No workspace tree loaded yet")
        })
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.sync.fetch_timeout {
            Some(limit) => with_timeout(limit, fut).await,
            None => fut.await,
        }
    }
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::SubjectType;

    #[test]
    fn test_in_memory_bindings_filtered_by_workspace() {
        let source = InMemorySource::default().with_bindings(vec![
            RoleBinding::new("viewer", "Viewer", "ops", SubjectType::Group, "root"),
            RoleBinding::new("admin", "Admin", "alice", SubjectType::User, "ws-1"),
        ]);

        let bindings =
            tokio_test::block_on(source.list_bindings(&WorkspaceId::new("ws-1"))).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].role_id.as_str(), "admin");
    }

    #[test]
    fn test_in_memory_without_grants_is_unrestricted() {
        let source = InMemorySource::default();
        let grants = tokio_test::block_on(source.permissions()).unwrap();
        let policy = VisibilityPolicy::from_grants(&grants, &AccessConfig::default().scope());
        assert!(policy.is_unrestricted());
    }

    #[test]
    fn test_in_memory_empty_grants_are_returned_verbatim() {
        let source = InMemorySource::default().with_grants(Vec::new());
        assert!(tokio_test::block_on(source.permissions()).unwrap().is_empty());

        source.clear_grants();
        let grants = tokio_test::block_on(source.permissions()).unwrap();
        assert_eq!(grants.len(), 1);
        assert!(!grants[0].is_scoped());
    }
}
