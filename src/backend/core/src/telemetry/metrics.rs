//! Metrics for tree building, filtering, fetching and store notifications.
//!
//! Everything is recorded through the `metrics` facade. Without an installed
//! recorder the calls are no-ops, so library users choose the exporter.
//!
//! # Example
//!
//! ```rust,no_run
//! use wsaccess_core::telemetry::metrics::{describe_metrics, record_tree_built};
//!
//! describe_metrics();
//! record_tree_built(42);
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

pub const TREES_BUILT: &str = "wsaccess_trees_built_total";
pub const TREE_BUILD_FAILURES: &str = "wsaccess_tree_build_failures_total";
pub const TREE_NODES: &str = "wsaccess_tree_nodes";
pub const FILTERS_APPLIED: &str = "wsaccess_filters_applied_total";
pub const STALE_RESPONSES: &str = "wsaccess_stale_responses_total";
pub const STORE_NOTIFICATIONS: &str = "wsaccess_store_notifications_total";
pub const STORE_SUBSCRIBERS: &str = "wsaccess_store_subscribers";
pub const REFRESHES: &str = "wsaccess_refreshes_total";
pub const REFRESH_DURATION: &str = "wsaccess_refresh_duration_seconds";

/// Register descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(TREES_BUILT, "Workspace trees built successfully");
    describe_counter!(TREE_BUILD_FAILURES, "Tree builds rejected as malformed, by kind");
    describe_gauge!(TREE_NODES, "Node count of the most recently built tree");
    describe_counter!(FILTERS_APPLIED, "Search and visibility filters applied");
    describe_counter!(STALE_RESPONSES, "Fetch completions discarded as stale");
    describe_counter!(STORE_NOTIFICATIONS, "Subscriber callbacks invoked by the selection store");
    describe_gauge!(STORE_SUBSCRIBERS, "Subscribers of the selection store after the last notification");
    describe_counter!(REFRESHES, "Workspace refreshes by outcome");
    describe_histogram!(REFRESH_DURATION, "Workspace refresh duration in seconds");
}

pub fn record_tree_built(nodes: usize) {
    counter!(TREES_BUILT).increment(1);
    gauge!(TREE_NODES).set(nodes as f64);
}

pub fn record_tree_build_failed(kind: &'static str) {
    counter!(TREE_BUILD_FAILURES, "kind" => kind).increment(1);
}

pub fn record_filter(filter: &'static str, empty: bool) {
    counter!(
        FILTERS_APPLIED,
        "filter" => filter,
        "result" => if empty { "empty" } else { "matched" },
    )
    .increment(1);
}

pub fn record_stale_response() {
    counter!(STALE_RESPONSES).increment(1);
}

pub fn record_notification(subscribers: usize) {
    counter!(STORE_NOTIFICATIONS).increment(subscribers as u64);
    gauge!(STORE_SUBSCRIBERS).set(subscribers as f64);
}

/// Times one refresh and records its outcome when finished or dropped.
#[derive(Debug)]
pub struct RefreshTimer {
    start: Instant,
    outcome: &'static str,
    recorded: bool,
}

impl RefreshTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            outcome: "cancelled",
            recorded: false,
        }
    }

    pub fn finish(mut self, outcome: &'static str) {
        self.outcome = outcome;
        self.record();
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        histogram!(REFRESH_DURATION, "outcome" => self.outcome)
            .record(self.start.elapsed().as_secs_f64());
        counter!(REFRESHES, "outcome" => self.outcome).increment(1);
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        // A refresh future dropped mid-flight still counts.
        self.record();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_tree_built(3);
        record_tree_build_failed("cycle");
        record_filter("search", true);
        record_stale_response();
        record_notification(2);
    }

    #[test]
    fn test_refresh_timer_records_once() {
        let mut timer = RefreshTimer::start();
        timer.record();
        assert!(timer.recorded);
        timer.finish("applied");
    }
}
