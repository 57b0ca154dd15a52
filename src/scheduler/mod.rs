//! Dependency-aware task scheduler.
//!
//! Locking discipline: the task table lives behind a mutex and is always
//! locked before any expression record is touched. Expression records live in
//! a [`DashMap`](dashmap::DashMap) whose shard locks are only held for the
//! duration of a single store call. Every cross-table step (commit, dispatch,
//! completion, invalidation) therefore runs under the task table lock.

pub mod dispatch;
pub mod expressions;
pub mod metrics;
pub mod model;
pub mod task_table;

pub use expressions::{
    Expression, ExpressionCounts, ExpressionStatus, ExpressionStore, ExpressionSummary,
};
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use model::{Operand, Operator, Task, TaskId, TaskPayload, TaskStatus};
pub use task_table::TaskTable;

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::compiler::CompiledExpression;
use crate::core::config::{OperationDurations, OrchestratorConfig};
use crate::core::errors::{OrchestratorError, Result};
use dispatch::{Dispatch, ScanAction};

/// Statistics about the scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub live_tasks: usize,
    pub in_progress_tasks: usize,
    pub low_water_mark: TaskId,
    pub next_task_id: TaskId,
    pub expressions: ExpressionCounts,
    pub metrics: MetricsSnapshot,
}

/// Owns the task table and the expression store
#[derive(Debug)]
pub struct Scheduler {
    tasks: Mutex<TaskTable>,
    expressions: ExpressionStore,
    durations: OperationDurations,
    task_lease: Option<Duration>,
    metrics: SchedulerMetrics,
}

impl Scheduler {
    pub fn new(durations: OperationDurations, task_lease: Option<Duration>) -> Self {
        Self {
            tasks: Mutex::new(TaskTable::new()),
            expressions: ExpressionStore::new(),
            durations,
            task_lease,
            metrics: SchedulerMetrics::new(),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.durations, config.task_lease)
    }

    fn lock_tasks(&self) -> Result<MutexGuard<'_, TaskTable>> {
        self.tasks
            .lock()
            .map_err(|_| OrchestratorError::internal("task table lock poisoned"))
    }

    pub fn has_expression(&self, id: &str) -> bool {
        self.expressions.contains(id)
    }

    /// Register a compiled expression under `id`.
    ///
    /// The duplicate check and the task commit happen in one critical section,
    /// so a rejected submission never leaves tasks behind.
    pub fn admit(&self, id: &str, source: &str, compiled: CompiledExpression) -> Result<()> {
        match compiled {
            CompiledExpression::Literal(value) => {
                self.expressions
                    .register(id, || Expression::literal(id, source, value))?;
                self.metrics.record_expression_submitted();
                self.metrics.record_expression_completed();
                info!("Expression {} is a literal, done with result {}", id, value);
            }
            CompiledExpression::Graph(graph) => {
                let mut tasks = self.lock_tasks()?;
                self.expressions.register(id, || {
                    let root = tasks.commit(&graph, id, &self.durations);
                    Expression::pending(id, source, root)
                })?;
                self.metrics.record_expression_submitted();
                self.metrics.record_tasks_created(graph.len());
                info!("Expression {} accepted with {} tasks", id, graph.len());
            }
        }
        Ok(())
    }

    /// Find the next ready task, mark it in progress and return its payload.
    ///
    /// Tasks of invalid expressions met during the scan are reclaimed, and a
    /// zero denominator discovered here invalidates the owning expression.
    /// `Ok(None)` means no task is ready right now.
    pub fn pull_next_task(&self) -> Result<Option<TaskPayload>> {
        let mut tasks = self.lock_tasks()?;
        let now = Instant::now();
        let mut cursor = tasks.advance_low_water();

        while let Some(action) = dispatch::next_action(&tasks, &self.expressions, cursor, now) {
            match action {
                ScanAction::Sweep { task_id } => {
                    let cancelled = tasks.cascade_cancel(task_id);
                    self.metrics.record_tasks_cancelled(cancelled);
                    cursor = task_id + 1;
                }
                ScanAction::Invalidate {
                    task_id,
                    expression_id,
                    reason,
                } => {
                    warn!("Task {} invalidates expression {}: {}", task_id, expression_id, reason);
                    self.invalidate(&mut tasks, task_id, &expression_id, reason);
                    cursor = task_id + 1;
                }
                ScanAction::Dispatch(ready) => {
                    return self.dispatch(&mut tasks, ready, now).map(Some);
                }
            }
        }

        Ok(None)
    }

    fn invalidate(&self, tasks: &mut TaskTable, task_id: TaskId, expression_id: &str, reason: &str) {
        if self.expressions.invalidate(expression_id, reason) {
            self.metrics.record_expression_invalidated();
        }
        let mut cancelled = 0;
        if let Some(root) = self.expressions.root_task(expression_id) {
            cancelled += tasks.cascade_cancel(root);
        }
        cancelled += tasks.cascade_cancel(task_id);
        self.metrics.record_tasks_cancelled(cancelled);
    }

    fn dispatch(&self, tasks: &mut TaskTable, dispatch: Dispatch, now: Instant) -> Result<TaskPayload> {
        let task = tasks.get_mut(dispatch.task_id).ok_or_else(|| {
            OrchestratorError::internal(format!("task {} vanished during dispatch", dispatch.task_id))
        })?;

        let consumed: Vec<TaskId> = task.dependencies().collect();
        task.left = Operand::Literal(dispatch.left);
        task.right = Operand::Literal(dispatch.right);
        task.status = TaskStatus::InProgress;
        task.attempts += 1;
        task.lease_deadline = self.task_lease.map(|lease| now + lease);

        let payload = TaskPayload {
            id: task.id,
            left: dispatch.left,
            right: dispatch.right,
            operator: task.operator,
            duration_hint: task.duration_hint,
        };
        let expression_id = task.expression_id.clone();
        let attempts = task.attempts;

        if dispatch.redispatch {
            warn!(
                "Task {} lease expired, dispatching again (attempt {})",
                payload.id, attempts
            );
            self.metrics.record_task_redispatched();
        } else {
            debug!(
                "Task {} dispatched: {} {} {}",
                payload.id, payload.left, payload.operator, payload.right
            );
            self.metrics.record_task_dispatched();
        }

        // operand values now live in the task itself
        let freed: usize = consumed.into_iter().map(|dep| tasks.cascade_free(dep)).sum();
        self.metrics.record_tasks_freed(freed);
        self.expressions.mark_calculating(&expression_id);

        Ok(payload)
    }

    /// Record a worker's result for a dispatched task.
    ///
    /// Fails with `TaskNotFound` when the task was already reclaimed, which
    /// workers should treat as benign, and with `TaskNotAwaitingResult` when
    /// the task is live but not in flight. Completing an expression's root
    /// task finishes the expression and frees the task.
    pub fn submit_result(&self, task_id: TaskId, value: f64) -> Result<()> {
        let mut tasks = self.lock_tasks()?;

        let Some(task) = tasks.get_mut(task_id) else {
            self.metrics.record_result_rejected();
            debug!("Task {} not found, ignoring result {}", task_id, value);
            return Err(OrchestratorError::TaskNotFound { task_id });
        };

        let rejection = if task.is_done() {
            Some("already completed")
        } else if task.attempts == 0 {
            Some("not dispatched")
        } else {
            None
        };
        if let Some(reason) = rejection {
            self.metrics.record_result_rejected();
            warn!("Task {} result rejected: {}", task_id, reason);
            return Err(OrchestratorError::TaskNotAwaitingResult {
                task_id,
                reason: reason.to_string(),
            });
        }

        task.result = value;
        task.status = TaskStatus::Completed;
        task.lease_deadline = None;
        let expression_id = task.expression_id.clone();
        self.metrics.record_task_completed();
        debug!("Task {} completed with result {}", task_id, value);

        if self.expressions.root_task(&expression_id) == Some(task_id) {
            if self.expressions.complete(&expression_id, value) {
                self.metrics.record_expression_completed();
            }
            let freed = tasks.cascade_free(task_id);
            self.metrics.record_tasks_freed(freed);
        }

        Ok(())
    }

    pub fn expression(&self, id: &str) -> Result<ExpressionSummary> {
        self.expressions
            .summary(id)
            .ok_or_else(|| OrchestratorError::ExpressionNotFound { id: id.to_string() })
    }

    pub fn expressions(&self) -> Vec<ExpressionSummary> {
        self.expressions.summaries()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn stats(&self) -> Result<SchedulerStats> {
        let tasks = self.lock_tasks()?;
        Ok(SchedulerStats {
            live_tasks: tasks.len(),
            in_progress_tasks: tasks.in_progress(),
            low_water_mark: tasks.low_water_mark(),
            next_task_id: tasks.next_id(),
            expressions: self.expressions.counts(),
            metrics: self.metrics.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use pretty_assertions::assert_eq;

    fn scheduler() -> Scheduler {
        Scheduler::new(OperationDurations::default(), None)
    }

    fn admit(scheduler: &Scheduler, id: &str, text: &str) {
        scheduler.admit(id, text, compile(text).unwrap()).unwrap();
    }

    #[test]
    fn test_addition_then_multiplication() {
        let scheduler = scheduler();
        admit(&scheduler, "e", "(1+2)*3");

        let first = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!((first.id, first.left, first.right), (1, 1.0, 2.0));
        assert_eq!(first.operator, Operator::Add);
        assert_eq!(scheduler.pull_next_task().unwrap(), None);
        assert_eq!(
            scheduler.expression("e").unwrap().status,
            ExpressionStatus::Calculating
        );

        scheduler.submit_result(1, 3.0).unwrap();
        let second = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!((second.id, second.left, second.right), (2, 3.0, 3.0));
        assert_eq!(second.operator, Operator::Mul);

        scheduler.submit_result(2, 9.0).unwrap();
        let summary = scheduler.expression("e").unwrap();
        assert_eq!(summary.status, ExpressionStatus::Done);
        assert_eq!(summary.result, Some(9.0));

        let stats = scheduler.stats().unwrap();
        assert_eq!(stats.live_tasks, 0);
        assert_eq!(stats.metrics.tasks_freed, 2);
    }

    #[test]
    fn test_results_for_cleared_tasks() {
        let scheduler = scheduler();
        admit(&scheduler, "e", "(1+2)*3");
        scheduler.pull_next_task().unwrap();
        scheduler.submit_result(1, 3.0).unwrap();

        // task 1 is completed but not yet consumed
        assert!(matches!(
            scheduler.submit_result(1, 3.0),
            Err(OrchestratorError::TaskNotAwaitingResult { task_id: 1, .. })
        ));

        scheduler.pull_next_task().unwrap();
        assert!(matches!(
            scheduler.submit_result(1, 3.0),
            Err(OrchestratorError::TaskNotFound { task_id: 1 })
        ));
        assert!(matches!(
            scheduler.submit_result(99, 1.0),
            Err(OrchestratorError::TaskNotFound { task_id: 99 })
        ));
    }

    #[test]
    fn test_result_before_dispatch_is_rejected() {
        let scheduler = scheduler();
        admit(&scheduler, "e", "1+2");
        assert!(matches!(
            scheduler.submit_result(1, 3.0),
            Err(OrchestratorError::TaskNotAwaitingResult { task_id: 1, .. })
        ));
        assert_eq!(scheduler.metrics().results_rejected, 1);
    }

    #[test]
    fn test_runtime_division_by_zero_cancels_graph() {
        let scheduler = scheduler();
        admit(&scheduler, "z", "(2+3)*(5/(1-1))");

        let mut dispatched = Vec::new();
        while let Some(task) = scheduler.pull_next_task().unwrap() {
            dispatched.push(task.id);
            // 2+3 and 1-1 are both ready immediately
            if dispatched.len() == 2 {
                break;
            }
        }
        assert_eq!(dispatched, vec![1, 2]);
        scheduler.submit_result(2, 0.0).unwrap();

        // the scan reaches 5/(1-1), invalidates, and finds nothing else
        assert_eq!(scheduler.pull_next_task().unwrap(), None);

        let summary = scheduler.expression("z").unwrap();
        assert_eq!(summary.status, ExpressionStatus::Invalid);
        assert_eq!(summary.error.as_deref(), Some("division by zero"));

        // the in-flight 2+3 was cancelled with the rest of the graph
        assert!(matches!(
            scheduler.submit_result(1, 5.0),
            Err(OrchestratorError::TaskNotFound { task_id: 1 })
        ));
        assert_eq!(scheduler.stats().unwrap().live_tasks, 0);
    }

    #[test]
    fn test_invalid_expression_does_not_block_others() {
        let scheduler = scheduler();
        admit(&scheduler, "z", "4/(2-2)");
        admit(&scheduler, "ok", "7-1");

        let task = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!(task.id, 1);
        scheduler.submit_result(1, 0.0).unwrap();

        let task = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!(task.id, 3);
        assert_eq!(
            scheduler.expression("z").unwrap().status,
            ExpressionStatus::Invalid
        );
    }

    #[test]
    fn test_literal_and_duplicates() {
        let scheduler = scheduler();
        admit(&scheduler, "lit", "42");
        assert_eq!(scheduler.pull_next_task().unwrap(), None);
        assert_eq!(scheduler.expression("lit").unwrap().result, Some(42.0));

        let err = scheduler
            .admit("lit", "1+1", compile("1+1").unwrap())
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateId { .. }));
        // the rejected graph was never committed
        assert_eq!(scheduler.stats().unwrap().next_task_id, 1);
    }

    #[test]
    fn test_lease_redispatch() {
        let scheduler = Scheduler::new(OperationDurations::default(), Some(Duration::from_millis(20)));
        admit(&scheduler, "e", "1+2");

        let first = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!(scheduler.pull_next_task().unwrap(), None);

        std::thread::sleep(Duration::from_millis(40));
        let again = scheduler.pull_next_task().unwrap().unwrap();
        assert_eq!(again, first);

        scheduler.submit_result(1, 3.0).unwrap();
        assert_eq!(scheduler.expression("e").unwrap().result, Some(3.0));
        assert!(matches!(
            scheduler.submit_result(1, 3.0),
            Err(OrchestratorError::TaskNotFound { .. })
        ));
        assert_eq!(scheduler.metrics().tasks_redispatched, 1);
    }
}
