//! Distributed arithmetic expression orchestrator.
//!
//! Clients submit infix expressions. Each expression is compiled into a
//! graph of binary tasks, and anonymous workers pull ready tasks and report
//! their results until the expression's value is known. The crate never
//! performs arithmetic itself.
//!
//! ```no_run
//! use exprflow::Orchestrator;
//!
//! let orchestrator = Orchestrator::default();
//! let id = orchestrator.submit_expression(None, "(1+2)*3")?;
//! while let Some(task) = orchestrator.pull_task()? {
//!     let value = match task.operator {
//!         exprflow::Operator::Add => task.left + task.right,
//!         exprflow::Operator::Sub => task.left - task.right,
//!         exprflow::Operator::Mul => task.left * task.right,
//!         exprflow::Operator::Div => task.left / task.right,
//!     };
//!     orchestrator.submit_result(task.id, value)?;
//! }
//! assert_eq!(orchestrator.get_expression(&id)?.result, Some(9.0));
//! # Ok::<(), exprflow::OrchestratorError>(())
//! ```

// Core infrastructure modules
pub mod core;

pub mod compiler;     // infix text to task graph
pub mod scheduler;    // task table, dispatch and completion cascade
pub mod orchestrator; // facade used by the transport layer
pub mod server;       // axum HTTP routes

// Re-exports for convenience
pub use crate::core::config::{OperationDurations, OrchestratorConfig};
pub use crate::core::errors::{OrchestratorError, Result};
pub use crate::core::ids::{Cuid2Generator, IdGenerator, SequentialIdGenerator};
pub use compiler::{compile, CompiledExpression};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use scheduler::{
    ExpressionStatus, ExpressionSummary, Operator, SchedulerStats, TaskId, TaskPayload,
};
