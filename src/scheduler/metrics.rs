//! Scheduler counters.
//!
//! Counters are monotonically increasing and updated with relaxed ordering;
//! a snapshot is a best-effort view, not a consistent cut.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Scheduler metrics
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Expressions accepted by submission (literals included)
    pub expressions_submitted: AtomicU64,
    pub expressions_completed: AtomicU64,
    pub expressions_invalidated: AtomicU64,
    /// Tasks committed to the task table
    pub tasks_created: AtomicU64,
    /// Tasks handed to a worker for the first time
    pub tasks_dispatched: AtomicU64,
    /// Tasks handed out again after their lease expired
    pub tasks_redispatched: AtomicU64,
    pub tasks_completed: AtomicU64,
    pub tasks_cancelled: AtomicU64,
    pub tasks_freed: AtomicU64,
    /// Worker reports that were refused
    pub results_rejected: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_expression_submitted(&self) {
        self.expressions_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expression_completed(&self) {
        self.expressions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expression_invalidated(&self) {
        self.expressions_invalidated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tasks_created(&self, count: usize) {
        self.tasks_created.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_task_dispatched(&self) {
        self.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_redispatched(&self) {
        self.tasks_redispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tasks_cancelled(&self, count: usize) {
        self.tasks_cancelled.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_tasks_freed(&self, count: usize) {
        self.tasks_freed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_result_rejected(&self) {
        self.results_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            expressions_submitted: self.expressions_submitted.load(Ordering::Relaxed),
            expressions_completed: self.expressions_completed.load(Ordering::Relaxed),
            expressions_invalidated: self.expressions_invalidated.load(Ordering::Relaxed),
            tasks_created: self.tasks_created.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            tasks_redispatched: self.tasks_redispatched.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_freed: self.tasks_freed.load(Ordering::Relaxed),
            results_rejected: self.results_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub expressions_submitted: u64,
    pub expressions_completed: u64,
    pub expressions_invalidated: u64,
    pub tasks_created: u64,
    pub tasks_dispatched: u64,
    pub tasks_redispatched: u64,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub tasks_freed: u64,
    pub results_rejected: u64,
}

impl MetricsSnapshot {
    /// Tasks that were created and have not yet been cancelled or freed
    pub fn tasks_outstanding(&self) -> u64 {
        self.tasks_created
            .saturating_sub(self.tasks_cancelled + self.tasks_freed)
    }
}
