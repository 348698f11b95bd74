//! Metrics for membership transitions
//!
//! Values go to the `metrics` facade (a no-op until a recorder is
//! installed) and to an in-process [`MetricsCollector`].

use metrics::{counter, describe_counter, describe_gauge, gauge};
use std::sync::Arc;

mod collector;

pub use collector::MetricsCollector;

pub const TRANSITIONS_TOTAL: &str = "membership.transitions.total";
pub const REMOTE_FAILURES_TOTAL: &str = "membership.remote_failures.total";
pub const UNAUTHORIZED_TOTAL: &str = "membership.unauthorized.total";
pub const RESYNCS_TOTAL: &str = "membership.resyncs.total";
pub const ROSTER_SIZE: &str = "membership.roster.size";
pub const REQUESTS_PENDING: &str = "membership.requests.pending";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(TRANSITIONS_TOTAL, "Membership transitions confirmed by the directory");
    describe_counter!(REMOTE_FAILURES_TOTAL, "Directory calls that failed or were rejected");
    describe_counter!(UNAUTHORIZED_TOTAL, "Actions refused by the role model");
    describe_counter!(RESYNCS_TOTAL, "Full re-fetches after local state diverged");
    describe_gauge!(ROSTER_SIZE, "Members in the open community view");
    describe_gauge!(REQUESTS_PENDING, "Pending join requests in the open community view");
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: std::time::SystemTime,
    pub transitions: u64,
    pub remote_failures: u64,
    pub unauthorized: u64,
    pub resyncs: u64,
}

/// Recording handle owned by a membership manager
#[derive(Debug, Clone)]
pub struct MembershipMetrics {
    enabled: bool,
    collector: Arc<MetricsCollector>,
}

impl MembershipMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            collector: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn transition(&self, action: &'static str) {
        if !self.enabled {
            return;
        }
        counter!(TRANSITIONS_TOTAL, "action" => action).increment(1);
        self.collector.inc_transitions();
    }

    pub fn remote_failure(&self, action: &'static str) {
        if !self.enabled {
            return;
        }
        counter!(REMOTE_FAILURES_TOTAL, "action" => action).increment(1);
        self.collector.inc_remote_failures();
    }

    pub fn unauthorized(&self, action: &'static str) {
        if !self.enabled {
            return;
        }
        counter!(UNAUTHORIZED_TOTAL, "action" => action).increment(1);
        self.collector.inc_unauthorized();
    }

    pub fn resync(&self) {
        if !self.enabled {
            return;
        }
        counter!(RESYNCS_TOTAL).increment(1);
        self.collector.inc_resyncs();
    }

    pub fn view_sizes(&self, members: usize, requests: usize) {
        if !self.enabled {
            return;
        }
        gauge!(ROSTER_SIZE).set(members as f64);
        gauge!(REQUESTS_PENDING).set(requests as f64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.collector.snapshot()
    }
}

impl Default for MembershipMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}
