//! Metrics sink
//!
//! The executor reports through an injected sink — there is no
//! module-level mutable state. The in-memory sink backs the /metrics
//! endpoint; tests and embedded uses can pass [`NoopMetrics`].

use linden_types::WorkflowAction;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters the transition executor reports into
pub trait MetricsSink: Send + Sync {
    fn transition_applied(&self, action: WorkflowAction);
    fn transition_rejected(&self, code: &str);
    fn idempotent_replay(&self);
}

/// Point-in-time snapshot of the in-memory counters
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub applied: u64,
    pub rejected: u64,
    pub replayed: u64,
    pub applied_by_action: BTreeMap<String, u64>,
    pub rejected_by_code: BTreeMap<String, u64>,
}

/// In-memory metrics for a single process
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    applied: AtomicU64,
    rejected: AtomicU64,
    replayed: AtomicU64,
    applied_by_action: Mutex<BTreeMap<String, u64>>,
    rejected_by_code: Mutex<BTreeMap<String, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            applied_by_action: self.applied_by_action.lock().clone(),
            rejected_by_code: self.rejected_by_code.lock().clone(),
        }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn transition_applied(&self, action: WorkflowAction) {
        self.applied.fetch_add(1, Ordering::Relaxed);
        *self
            .applied_by_action
            .lock()
            .entry(action.as_str().to_string())
            .or_insert(0) += 1;
    }

    fn transition_rejected(&self, code: &str) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        *self
            .rejected_by_code
            .lock()
            .entry(code.to_string())
            .or_insert(0) += 1;
    }

    fn idempotent_replay(&self) {
        self.replayed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Discards every report
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn transition_applied(&self, _action: WorkflowAction) {}
    fn transition_rejected(&self, _code: &str) {}
    fn idempotent_replay(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = InMemoryMetrics::new();
        metrics.transition_applied(WorkflowAction::Submit);
        metrics.transition_applied(WorkflowAction::Submit);
        metrics.transition_applied(WorkflowAction::Approve);
        metrics.transition_rejected("WRONG_ROLE");
        metrics.idempotent_replay();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.applied, 3);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.replayed, 1);
        assert_eq!(snapshot.applied_by_action["SUBMIT"], 2);
        assert_eq!(snapshot.rejected_by_code["WRONG_ROLE"], 1);
    }
}
