use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::compiler::{Slot, TaskGraph};
use crate::core::config::OperationDurations;
use crate::scheduler::model::{Operand, Task, TaskId, TaskStatus};

/// How a reclaimed subtree is accounted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaim {
    /// The owning expression became invalid
    Cancel,
    /// The subtree's value has been consumed by an ancestor
    Free,
}

/// Arena of live tasks keyed by monotonically increasing id.
///
/// Not synchronized on its own; the scheduler keeps it behind a mutex.
#[derive(Debug)]
pub struct TaskTable {
    tasks: BTreeMap<TaskId, Task>,
    next_id: TaskId,
    /// Every id below this mark is completed or gone
    low_water: TaskId,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_id: 1,
            low_water: 1,
        }
    }

    /// Register a compiled graph for an expression and return the root task id.
    ///
    /// The graph receives one contiguous id range; node `i` becomes task `base + i`.
    pub fn commit(
        &mut self,
        graph: &TaskGraph,
        expression_id: &str,
        durations: &OperationDurations,
    ) -> TaskId {
        let base = self.next_id;
        let resolve = |slot: Slot| match slot {
            Slot::Literal(value) => Operand::Literal(value),
            Slot::Node(index) => Operand::TaskRef(base + index as TaskId),
        };

        for (index, node) in graph.nodes().iter().enumerate() {
            let id = base + index as TaskId;
            self.tasks.insert(
                id,
                Task {
                    id,
                    left: resolve(node.left),
                    right: resolve(node.right),
                    operator: node.operator,
                    duration_hint: durations.for_operator(node.operator),
                    expression_id: expression_id.to_string(),
                    result: 0.0,
                    status: TaskStatus::Pending,
                    attempts: 0,
                    lease_deadline: None,
                },
            );
        }

        self.next_id = base + graph.len() as TaskId;
        debug!(
            "Expression {}: registered tasks {}..={}",
            expression_id,
            base,
            self.next_id - 1
        );
        base + graph.root() as TaskId
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn low_water_mark(&self) -> TaskId {
        self.low_water
    }

    pub fn in_progress(&self) -> usize {
        self.tasks.values().filter(|t| t.is_in_progress()).count()
    }

    /// Live tasks with id >= `from`, in ascending id order
    pub fn iter_from(&self, from: TaskId) -> impl Iterator<Item = &Task> {
        self.tasks.range(from..).map(|(_, task)| task)
    }

    /// Move the low-water mark up to the first task that is not completed.
    ///
    /// Completed tasks below the mark stay in the table until an ancestor
    /// consumes them, but they are never candidates for dispatch again.
    pub fn advance_low_water(&mut self) -> TaskId {
        self.low_water = self
            .tasks
            .range(self.low_water..)
            .find(|(_, task)| !task.is_done())
            .map(|(id, _)| *id)
            .unwrap_or(self.next_id);
        self.low_water
    }

    /// Remove `root` and every task reachable through its operands.
    ///
    /// Walks an explicit worklist so deep expressions cannot exhaust the call
    /// stack. Returns the number of tasks removed.
    pub fn reclaim(&mut self, root: TaskId, mode: Reclaim) -> usize {
        let mut worklist = vec![root];
        let mut removed = 0;

        while let Some(id) = worklist.pop() {
            let Some(task) = self.tasks.remove(&id) else {
                continue;
            };
            worklist.extend(task.dependencies());
            removed += 1;
            match mode {
                Reclaim::Cancel => {
                    if task.is_in_progress() {
                        warn!("Task {} cancelled while in progress", id);
                    } else {
                        debug!("Task {} cancelled", id);
                    }
                }
                Reclaim::Free => debug!("Task {} has been freed", id),
            }
        }

        removed
    }

    /// Reclaim a subtree because its expression became invalid
    pub fn cascade_cancel(&mut self, root: TaskId) -> usize {
        self.reclaim(root, Reclaim::Cancel)
    }

    /// Reclaim a subtree whose value has been copied out
    pub fn cascade_free(&mut self, root: TaskId) -> usize {
        self.reclaim(root, Reclaim::Free)
    }
}
