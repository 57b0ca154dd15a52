//! Expression compiler: infix text to a literal or a binary task graph.
//!
//! Compilation is pure. The produced [`TaskGraph`] uses local node indices and
//! only becomes visible to workers once the scheduler commits it.

pub mod graph;
pub mod postfix;

pub use graph::{CompiledExpression, Slot, TaskGraph, TaskNode};
pub use postfix::Token;

use tracing::debug;

use crate::core::errors::Result;

/// Compile infix text into a literal result or a task graph
pub fn compile(text: &str) -> Result<CompiledExpression> {
    let postfix = postfix::to_postfix(text)?;
    debug!("Compiled '{}' to {} postfix tokens", text, postfix.len());
    graph::build_graph(&postfix)
}
