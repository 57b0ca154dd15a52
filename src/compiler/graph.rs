//! Postfix evaluation into a private task graph.

use crate::compiler::postfix::Token;
use crate::core::errors::{OrchestratorError, Result};
use crate::scheduler::model::Operator;

/// Operand slot of a scratch node: a literal or the index of an earlier node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Literal(f64),
    Node(usize),
}

/// One binary operation in the scratch graph
#[derive(Debug, Clone, PartialEq)]
pub struct TaskNode {
    pub left: Slot,
    pub right: Slot,
    pub operator: Operator,
}

/// Task graph built outside the shared task table.
///
/// Nodes are stored in creation order, so every `Slot::Node` points at a
/// lower index than the node holding it. The last node is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }
}

/// Outcome of compiling one expression
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpression {
    /// The expression is a single number and needs no tasks
    Literal(f64),
    Graph(TaskGraph),
}

/// Evaluate a postfix sequence into a literal or a task graph.
pub fn build_graph(postfix: &[Token]) -> Result<CompiledExpression> {
    let mut stack: Vec<Slot> = Vec::with_capacity(postfix.len());
    let mut nodes: Vec<TaskNode> = Vec::new();

    for token in postfix {
        match token {
            Token::Number(text) => stack.push(Slot::Literal(parse_literal(text)?)),
            Token::Operator(op) => {
                let (left, right) = match (stack.pop(), stack.pop()) {
                    (Some(right), Some(left)) => (left, right),
                    _ => return Err(OrchestratorError::semantic("malformed expression")),
                };
                if *op == Operator::Div && right == Slot::Literal(0.0) {
                    return Err(OrchestratorError::semantic("division by zero"));
                }
                nodes.push(TaskNode {
                    left,
                    right,
                    operator: *op,
                });
                stack.push(Slot::Node(nodes.len() - 1));
            }
            Token::LeftParen | Token::RightParen => {
                return Err(OrchestratorError::semantic("malformed expression"))
            }
        }
    }

    if stack.len() != 1 {
        return Err(OrchestratorError::semantic("malformed expression"));
    }

    match stack[0] {
        Slot::Literal(value) => Ok(CompiledExpression::Literal(value)),
        Slot::Node(_) => Ok(CompiledExpression::Graph(TaskGraph { nodes })),
    }
}

fn parse_literal(text: &str) -> Result<f64> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(OrchestratorError::semantic(format!(
            "non-numeric literal '{}'",
            text
        ))),
    }
}
