#![allow(dead_code)]

use exprflow::{Operator, Orchestrator, TaskPayload};

/// What a worker would compute for a task
pub fn evaluate(task: &TaskPayload) -> f64 {
    match task.operator {
        Operator::Add => task.left + task.right,
        Operator::Sub => task.left - task.right,
        Operator::Mul => task.left * task.right,
        Operator::Div => task.left / task.right,
    }
}

/// Pull and answer tasks until none is ready; returns the dispatched tasks in order
pub fn drain(orchestrator: &Orchestrator) -> Vec<TaskPayload> {
    let mut dispatched = Vec::new();
    while let Some(task) = orchestrator.pull_task().expect("pull task") {
        orchestrator
            .submit_result(task.id, evaluate(&task))
            .expect("submit result");
        dispatched.push(task);
    }
    dispatched
}
