use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// Type aliases
pub type TaskId = u64;

/// Binary arithmetic operator carried by a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One side of a binary task: a known number or the pending result of another task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    TaskRef(TaskId),
}

impl Operand {
    pub fn task_ref(&self) -> Option<TaskId> {
        match self {
            Operand::TaskRef(id) => Some(*id),
            Operand::Literal(_) => None,
        }
    }
}

/// Lifecycle of a live task.
///
/// `Ready` is not stored: a `Pending` task is ready once every `TaskRef`
/// operand points at a `Completed` task. Cancelled tasks are removed from
/// the table rather than kept in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Core task structure
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub left: Operand,
    pub right: Operand,
    pub operator: Operator,
    /// Simulated duration in milliseconds, forwarded to workers verbatim
    pub duration_hint: u64,
    pub expression_id: String,
    pub result: f64,
    pub status: TaskStatus,
    /// Number of times the task has been handed to a worker
    pub attempts: u32,
    pub lease_deadline: Option<Instant>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TaskStatus::InProgress
    }

    /// Whether an in-progress task's lease ran out before its worker reported
    pub fn lease_expired(&self, now: Instant) -> bool {
        self.is_in_progress() && self.lease_deadline.map_or(false, |deadline| now >= deadline)
    }

    /// Ids of the tasks this one still reads its operands from
    pub fn dependencies(&self) -> impl Iterator<Item = TaskId> {
        [self.left.task_ref(), self.right.task_ref()]
            .into_iter()
            .flatten()
    }
}

/// Work item handed to a worker: both operands resolved to numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: TaskId,
    #[serde(rename = "arg1")]
    pub left: f64,
    #[serde(rename = "arg2")]
    pub right: f64,
    #[serde(rename = "operation")]
    pub operator: Operator,
    #[serde(rename = "operation_time")]
    pub duration_hint: u64,
}
