//! Observable selection store.
//!
//! Holds the fetch status, the current tree snapshot and the UI-transient
//! selection state, and notifies subscribers after every mutation.
//!
//! Notification contract:
//! - every setter updates the state, then invokes each current subscriber
//!   exactly once, synchronously, in subscription order;
//! - callbacks run after the state lock is released, so they may read the
//!   store or call setters (which notify again);
//! - a mutation and its notification are serialised across threads, so the
//!   last snapshot a subscriber receives is the latest state;
//! - [`SelectionStore::batch`] applies several mutations with one notification.
//!
//! Fetch completions are sequenced by [`FetchTicket`]: a completion whose
//! ticket is not newer than the last accepted one is discarded.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wsaccess_core::store::SelectionStore;
//! use wsaccess_core::workspace::WorkspaceId;
//!
//! let store = Arc::new(SelectionStore::new());
//! let sub = store.subscribe(|state| {
//!     println!("selected: {:?}", state.selected_node_id);
//! });
//! store.set_selected_workspace(WorkspaceId::new("ws-1"));
//! sub.unsubscribe();
//! ```

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

use crate::telemetry::metrics;
use crate::workspace::{TreeNode, WorkspaceId, WorkspaceTree};

// ═══════════════════════════════════════════════════════════════════════════════
// State
// ═══════════════════════════════════════════════════════════════════════════════

/// Snapshot of the store, handed to subscribers and returned by [`SelectionStore::state`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub is_menu_expanded: bool,
    pub is_fetching: bool,
    pub is_fetch_error: bool,
    pub selected_node_id: Option<WorkspaceId>,
    pub tree: Option<Arc<WorkspaceTree>>,
    /// Nodes expanded in the tree menu
    pub expanded_ids: BTreeSet<WorkspaceId>,
    /// When a fetched tree was last applied
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Where the fetch lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Fetching,
    /// Idle, with the last fetch having failed
    Failed,
}

impl SelectionState {
    pub fn fetch_status(&self) -> FetchStatus {
        if self.is_fetching {
            FetchStatus::Fetching
        } else if self.is_fetch_error {
            FetchStatus::Failed
        } else {
            FetchStatus::Idle
        }
    }

    /// The selected node, if a tree is loaded and contains it.
    pub fn selected_node(&self) -> Option<&TreeNode> {
        let tree = self.tree.as_deref()?;
        tree.get_by_id(self.selected_node_id.as_ref()?)
    }

    pub fn is_expanded(&self, id: &WorkspaceId) -> bool {
        self.expanded_ids.contains(id)
    }

    fn apply_tree(&mut self, tree: Arc<WorkspaceTree>) {
        let keep_selection = self
            .selected_node_id
            .as_ref()
            .is_some_and(|id| tree.contains(id));
        if !keep_selection {
            let root = tree.root_node().id().clone();
            debug!(previous = ?self.selected_node_id, root = %root, "Selection falls back to root");
            self.selected_node_id = Some(root);
        }

        self.expanded_ids.retain(|id| tree.contains(id));
        self.tree = Some(tree);
    }

    fn set_expanded(&mut self, id: WorkspaceId, expanded: bool) {
        if expanded {
            self.expanded_ids.insert(id);
        } else {
            self.expanded_ids.remove(&id);
        }
    }

    fn toggle_expanded(&mut self, id: WorkspaceId) -> bool {
        if self.expanded_ids.remove(&id) {
            false
        } else {
            self.expanded_ids.insert(id);
            true
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fetch Sequencing
// ═══════════════════════════════════════════════════════════════════════════════

/// Issued by [`SelectionStore::begin_fetch`]; newer fetches get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Result of one fetch, handed back to the store.
#[derive(Debug, Clone)]
pub enum FetchCompletion {
    Loaded(Arc<WorkspaceTree>),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The completion was applied to the state.
    Applied,
    /// A newer fetch had already completed; the completion was discarded.
    Stale,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ═══════════════════════════════════════════════════════════════════════════════

type Listener = Arc<dyn Fn(&SelectionState) + Send + Sync>;
type ListenerList = Mutex<Vec<(u64, Listener)>>;

/// Handle returned by [`SelectionStore::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove this subscriber. Returns `false` if the store is gone.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.lock();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        trace!(subscription = self.id, "Unsubscribed");
        listeners.len() != before
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Inner {
    state: SelectionState,
    /// Last ticket issued
    issued: u64,
    /// Newest ticket whose completion was accepted
    accepted: u64,
}

/// Counters about store activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub notifications: u64,
    pub stale_discarded: u64,
    pub subscribers: usize,
}

/// Shared, observable selection state.
///
/// Construct one per console session and share it by `Arc`.
pub struct SelectionStore {
    inner: Mutex<Inner>,
    /// Held from mutation through notification. Re-entrant so callbacks may
    /// call setters on the notifying thread.
    delivery: ReentrantMutex<()>,
    listeners: Arc<ListenerList>,
    next_subscription: AtomicU64,
    notifications: AtomicU64,
    stale_discarded: AtomicU64,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStore")
            .field("state", &self.inner.lock().state)
            .field("subscribers", &self.listeners.lock().len())
            .finish()
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            delivery: ReentrantMutex::new(()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_subscription: AtomicU64::new(1),
            notifications: AtomicU64::new(0),
            stale_discarded: AtomicU64::new(0),
        }
    }

    /// Copy of the current state.
    pub fn state(&self) -> SelectionState {
        self.inner.lock().state.clone()
    }

    /// Current tree snapshot, if one has been loaded.
    pub fn tree(&self) -> Option<Arc<WorkspaceTree>> {
        self.inner.lock().state.tree.clone()
    }

    pub fn selected_workspace(&self) -> Option<WorkspaceId> {
        self.inner.lock().state.selected_node_id.clone()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            notifications: self.notifications.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            subscribers: self.listeners.lock().len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a callback invoked after every mutation.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SelectionState) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        trace!(subscription = id, "Subscribed");
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Setters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_is_menu_expanded(&self, expanded: bool) {
        self.update(|state| state.is_menu_expanded = expanded);
    }

    pub fn set_is_fetching(&self, fetching: bool) {
        self.update(|state| state.is_fetching = fetching);
    }

    pub fn set_is_fetch_error(&self, failed: bool) {
        self.update(|state| state.is_fetch_error = failed);
    }

    pub fn set_selected_workspace(&self, id: impl Into<WorkspaceId>) {
        let id = id.into();
        self.update(|state| state.selected_node_id = Some(id));
    }

    pub fn clear_selection(&self) {
        self.update(|state| state.selected_node_id = None);
    }

    /// Replace the tree snapshot.
    ///
    /// The selection is kept if the new tree contains it and otherwise falls
    /// back to the root. Expanded ids missing from the new tree are dropped.
    pub fn set_tree(&self, tree: Arc<WorkspaceTree>) {
        self.update(|state| state.apply_tree(tree));
    }

    pub fn set_expanded(&self, id: impl Into<WorkspaceId>, expanded: bool) {
        let id = id.into();
        self.update(|state| state.set_expanded(id, expanded));
    }

    /// Flip the expansion of `id`; returns the new value.
    pub fn toggle_expanded(&self, id: impl Into<WorkspaceId>) -> bool {
        let id = id.into();
        self.update(|state| state.toggle_expanded(id))
    }

    /// Apply several mutations and notify once at the end.
    pub fn batch<R>(&self, f: impl FnOnce(&mut StoreTx<'_>) -> R) -> R {
        self.update(|state| f(&mut StoreTx { state }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a fetch: marks the store as fetching and issues a ticket.
    pub fn begin_fetch(&self) -> FetchTicket {
        self.update_with(|inner| {
            inner.issued += 1;
            inner.state.is_fetching = true;
            FetchTicket(inner.issued)
        })
    }

    /// Hand back the result of the fetch identified by `ticket`.
    ///
    /// Stale completions change nothing and do not notify. Accepted failures
    /// set the error flag and keep the previous tree.
    pub fn complete_fetch(&self, ticket: FetchTicket, completion: FetchCompletion) -> FetchOutcome {
        let _delivery = self.delivery.lock();
        let mut inner = self.inner.lock();

        if ticket.0 <= inner.accepted {
            let accepted = inner.accepted;
            drop(inner);
            warn!(
                ticket = ticket.0,
                accepted = accepted,
                "Discarding stale fetch response"
            );
            self.stale_discarded.fetch_add(1, Ordering::Relaxed);
            metrics::record_stale_response();
            return FetchOutcome::Stale;
        }

        inner.accepted = ticket.0;
        let newer_outstanding = inner.accepted < inner.issued;
        inner.state.is_fetching = newer_outstanding;
        match completion {
            FetchCompletion::Loaded(tree) => {
                debug!(ticket = ticket.0, nodes = tree.len(), "Applying fetched tree");
                inner.state.apply_tree(tree);
                inner.state.is_fetch_error = false;
                inner.state.last_fetched_at = Some(Utc::now());
            }
            FetchCompletion::Failed => {
                debug!(ticket = ticket.0, "Fetch failed; keeping previous tree");
                inner.state.is_fetch_error = true;
            }
        }

        let snapshot = inner.state.clone();
        drop(inner);
        self.notify(&snapshot);
        FetchOutcome::Applied
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn update<R>(&self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        self.update_with(|inner| f(&mut inner.state))
    }

    fn update_with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let _delivery = self.delivery.lock();
        let (result, snapshot) = {
            let mut inner = self.inner.lock();
            let result = f(&mut inner);
            (result, inner.state.clone())
        };
        self.notify(&snapshot);
        result
    }

    fn notify(&self, snapshot: &SelectionState) {
        // Copy the list so callbacks can subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(snapshot);
        }

        self.notifications
            .fetch_add(listeners.len() as u64, Ordering::Relaxed);
        metrics::record_notification(listeners.len());
    }
}

/// Mutation handle passed to [`SelectionStore::batch`].
pub struct StoreTx<'a> {
    state: &'a mut SelectionState,
}

impl StoreTx<'_> {
    pub fn state(&self) -> &SelectionState {
        self.state
    }

    pub fn set_is_menu_expanded(&mut self, expanded: bool) {
        self.state.is_menu_expanded = expanded;
    }

    pub fn set_is_fetching(&mut self, fetching: bool) {
        self.state.is_fetching = fetching;
    }

    pub fn set_is_fetch_error(&mut self, failed: bool) {
        self.state.is_fetch_error = failed;
    }

    pub fn set_selected_workspace(&mut self, id: impl Into<WorkspaceId>) {
        self.state.selected_node_id = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_node_id = None;
    }

    pub fn set_tree(&mut self, tree: Arc<WorkspaceTree>) {
        self.state.apply_tree(tree);
    }

    pub fn set_expanded(&mut self, id: impl Into<WorkspaceId>, expanded: bool) {
        self.state.set_expanded(id.into(), expanded);
    }

    pub fn toggle_expanded(&mut self, id: impl Into<WorkspaceId>) -> bool {
        self.state.toggle_expanded(id.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
