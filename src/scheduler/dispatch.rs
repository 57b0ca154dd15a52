//! Ready-task scan.
//!
//! The scan is read-only: it reports the first task that needs attention and
//! the scheduler applies the outcome while still holding the table lock.

use std::time::Instant;

use crate::scheduler::expressions::{ExpressionStatus, ExpressionStore};
use crate::scheduler::model::{Operand, Operator, Task, TaskId};
use crate::scheduler::task_table::TaskTable;

pub const REASON_DIVISION_BY_ZERO: &str = "division by zero";
pub const REASON_MALFORMED_GRAPH: &str = "malformed task graph";

/// What the scheduler has to do with the task the scan stopped at
#[derive(Debug, Clone, PartialEq)]
pub enum ScanAction {
    /// The owning expression is already invalid; reclaim the task's subtree
    Sweep { task_id: TaskId },
    /// The task can never be computed; the owning expression must be invalidated
    Invalidate {
        task_id: TaskId,
        expression_id: String,
        reason: &'static str,
    },
    /// Hand the task to a worker with both operands resolved
    Dispatch(Dispatch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub task_id: TaskId,
    pub left: f64,
    pub right: f64,
    /// The task was handed out before and its lease expired
    pub redispatch: bool,
}

enum Readiness {
    Ready(f64),
    Waiting,
    Missing,
}

fn resolve(table: &TaskTable, operand: Operand) -> Readiness {
    match operand {
        Operand::Literal(value) => Readiness::Ready(value),
        Operand::TaskRef(id) => match table.get(id) {
            Some(dep) if dep.is_done() => Readiness::Ready(dep.result),
            Some(_) => Readiness::Waiting,
            None => Readiness::Missing,
        },
    }
}

fn inspect(
    table: &TaskTable,
    expressions: &ExpressionStore,
    task: &Task,
    now: Instant,
) -> Option<ScanAction> {
    if task.is_done() {
        return None;
    }

    match expressions.status(&task.expression_id) {
        Some(ExpressionStatus::Invalid) | None => {
            return Some(ScanAction::Sweep { task_id: task.id })
        }
        Some(_) => {}
    }

    let redispatch = task.is_in_progress();
    if redispatch && !task.lease_expired(now) {
        return None;
    }

    let invalidate = |reason| {
        Some(ScanAction::Invalidate {
            task_id: task.id,
            expression_id: task.expression_id.clone(),
            reason,
        })
    };

    let (left, right) = match (resolve(table, task.left), resolve(table, task.right)) {
        (Readiness::Missing, _) | (_, Readiness::Missing) => {
            return invalidate(REASON_MALFORMED_GRAPH)
        }
        (Readiness::Ready(left), Readiness::Ready(right)) => (left, right),
        _ => return None,
    };

    if task.operator == Operator::Div && right == 0.0 {
        return invalidate(REASON_DIVISION_BY_ZERO);
    }

    Some(ScanAction::Dispatch(Dispatch {
        task_id: task.id,
        left,
        right,
        redispatch,
    }))
}

/// Scan live tasks with id >= `from` in ascending order and return the first
/// one that must be swept, invalidated or dispatched.
pub fn next_action(
    table: &TaskTable,
    expressions: &ExpressionStore,
    from: TaskId,
    now: Instant,
) -> Option<ScanAction> {
    table
        .iter_from(from)
        .find_map(|task| inspect(table, expressions, task, now))
}
