use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::errors::{OrchestratorError, Result};
use crate::scheduler::model::TaskId;

/// Lifecycle of a submitted expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Calculating,
    Done,
    Invalid,
}

impl ExpressionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpressionStatus::Done | ExpressionStatus::Invalid)
    }

    /// Forward-only transitions; terminal states never change
    pub fn can_transition_to(&self, next: ExpressionStatus) -> bool {
        use ExpressionStatus::*;
        matches!(
            (self, next),
            (Pending, Calculating) | (Pending, Done) | (Pending, Invalid)
                | (Calculating, Done)
                | (Calculating, Invalid)
        )
    }
}

/// Expression record, retained for the lifetime of the process
#[derive(Debug, Clone)]
pub struct Expression {
    pub id: String,
    pub source: String,
    pub status: ExpressionStatus,
    /// Meaningful only when `status` is `Done`
    pub result: f64,
    pub root_task: Option<TaskId>,
    /// Why the expression became invalid
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expression {
    /// Expression waiting for its task graph to be evaluated
    pub fn pending(id: impl Into<String>, source: impl Into<String>, root_task: TaskId) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source: source.into(),
            status: ExpressionStatus::Pending,
            result: 0.0,
            root_task: Some(root_task),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Expression that compiled to a single number and needs no tasks
    pub fn literal(id: impl Into<String>, source: impl Into<String>, value: f64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source: source.into(),
            status: ExpressionStatus::Done,
            result: value,
            root_task: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Client-facing view of an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSummary {
    pub id: String,
    pub expression: String,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Expression> for ExpressionSummary {
    fn from(expression: &Expression) -> Self {
        Self {
            id: expression.id.clone(),
            expression: expression.source.clone(),
            status: expression.status,
            result: (expression.status == ExpressionStatus::Done).then_some(expression.result),
            error: expression.error.clone(),
            created_at: expression.created_at,
            updated_at: expression.updated_at,
        }
    }
}

/// Number of expressions in each status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionCounts {
    pub pending: usize,
    pub calculating: usize,
    pub done: usize,
    pub invalid: usize,
}

impl ExpressionCounts {
    pub fn total(&self) -> usize {
        self.pending + self.calculating + self.done + self.invalid
    }
}

/// Expression records keyed by client-visible id.
///
/// Accessors never hand out map references, so callers cannot hold two
/// shard locks at once.
#[derive(Debug, Default)]
pub struct ExpressionStore {
    expressions: DashMap<String, Expression>,
}

impl ExpressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the record produced by `build` unless `id` is taken.
    ///
    /// `build` runs while the id's slot is reserved, so whatever it registers
    /// elsewhere is only done for an id that is guaranteed to be new.
    pub fn register<F>(&self, id: &str, build: F) -> Result<()>
    where
        F: FnOnce() -> Expression,
    {
        match self.expressions.entry(id.to_string()) {
            Entry::Occupied(_) => Err(OrchestratorError::DuplicateId { id: id.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(build());
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.expressions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn summary(&self, id: &str) -> Option<ExpressionSummary> {
        self.expressions.get(id).map(|e| ExpressionSummary::from(e.value()))
    }

    /// Snapshot of every expression, in no particular order
    pub fn summaries(&self) -> Vec<ExpressionSummary> {
        self.expressions
            .iter()
            .map(|e| ExpressionSummary::from(e.value()))
            .collect()
    }

    pub fn status(&self, id: &str) -> Option<ExpressionStatus> {
        self.expressions.get(id).map(|e| e.status)
    }

    pub fn root_task(&self, id: &str) -> Option<TaskId> {
        self.expressions.get(id).and_then(|e| e.root_task)
    }

    /// Record that one of the expression's tasks has been handed to a worker
    pub fn mark_calculating(&self, id: &str) -> bool {
        if self.status(id) == Some(ExpressionStatus::Calculating) {
            return true;
        }
        self.transition(id, ExpressionStatus::Calculating, |_| {})
    }

    /// Store the root task's value and finish the expression
    pub fn complete(&self, id: &str, value: f64) -> bool {
        let done = self.transition(id, ExpressionStatus::Done, |e| e.result = value);
        if done {
            info!("Expression {} completed with result {}", id, value);
        }
        done
    }

    /// Mark the expression invalid, keeping `reason` for clients
    pub fn invalidate(&self, id: &str, reason: &str) -> bool {
        let invalid = self.transition(id, ExpressionStatus::Invalid, |e| {
            e.error = Some(reason.to_string())
        });
        if invalid {
            info!("Expression {} is invalid: {}", id, reason);
        }
        invalid
    }

    pub fn counts(&self) -> ExpressionCounts {
        let mut counts = ExpressionCounts::default();
        for entry in self.expressions.iter() {
            match entry.status {
                ExpressionStatus::Pending => counts.pending += 1,
                ExpressionStatus::Calculating => counts.calculating += 1,
                ExpressionStatus::Done => counts.done += 1,
                ExpressionStatus::Invalid => counts.invalid += 1,
            }
        }
        counts
    }

    fn transition<F>(&self, id: &str, next: ExpressionStatus, apply: F) -> bool
    where
        F: FnOnce(&mut Expression),
    {
        let Some(mut expression) = self.expressions.get_mut(id) else {
            warn!("Expression {} not found for transition to {:?}", id, next);
            return false;
        };
        if !expression.status.can_transition_to(next) {
            warn!(
                "Expression {}: ignoring transition {:?} -> {:?}",
                id, expression.status, next
            );
            return false;
        }
        apply(expression.value_mut());
        expression.status = next;
        expression.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transitions() {
        use ExpressionStatus::*;
        assert!(Pending.can_transition_to(Calculating));
        assert!(Calculating.can_transition_to(Done));
        assert!(Calculating.can_transition_to(Invalid));
        assert!(!Done.can_transition_to(Invalid));
        assert!(!Invalid.can_transition_to(Done));
        assert!(!Calculating.can_transition_to(Pending));
        assert!(Done.is_terminal() && Invalid.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let store = ExpressionStore::new();
        store.register("a", || Expression::pending("a", "1+2", 1)).unwrap();

        let mut built = false;
        let err = store
            .register("a", || {
                built = true;
                Expression::literal("a", "3", 3.0)
            })
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateId { ref id } if id == "a"));
        assert!(!built);
        assert_eq!(store.root_task("a"), Some(1));
    }

    #[test]
    fn test_lifecycle() {
        let store = ExpressionStore::new();
        store.register("a", || Expression::pending("a", "1+2", 1)).unwrap();
        assert_eq!(store.summary("a").unwrap().result, None);

        assert!(store.mark_calculating("a"));
        assert!(store.mark_calculating("a"));
        assert!(store.complete("a", 3.0));

        let summary = store.summary("a").unwrap();
        assert_eq!(summary.status, ExpressionStatus::Done);
        assert_eq!(summary.result, Some(3.0));
        assert_eq!(summary.expression, "1+2");

        // terminal states never change
        assert!(!store.invalidate("a", "division by zero"));
        assert!(!store.mark_calculating("a"));
        assert_eq!(store.status("a"), Some(ExpressionStatus::Done));
    }

    #[test]
    fn test_invalidate_keeps_reason() {
        let store = ExpressionStore::new();
        store.register("b", || Expression::pending("b", "5/(1-1)", 2)).unwrap();
        assert!(store.invalidate("b", "division by zero"));

        let summary = store.summary("b").unwrap();
        assert_eq!(summary.status, ExpressionStatus::Invalid);
        assert_eq!(summary.result, None);
        assert_eq!(summary.error.as_deref(), Some("division by zero"));
        assert!(!store.complete("b", 1.0));
    }

    #[test]
    fn test_counts_and_wire_format() {
        let store = ExpressionStore::new();
        store.register("a", || Expression::literal("a", "42", 42.0)).unwrap();
        store.register("b", || Expression::pending("b", "1+1", 1)).unwrap();
        store.register("c", || Expression::pending("c", "1/(1-1)", 3)).unwrap();
        store.invalidate("c", "division by zero");

        assert_eq!(
            store.counts(),
            ExpressionCounts {
                pending: 1,
                calculating: 0,
                done: 1,
                invalid: 1,
            }
        );
        assert_eq!(store.counts().total(), 3);
        assert_eq!(store.summaries().len(), 3);

        let value = serde_json::to_value(store.summary("a").unwrap()).unwrap();
        assert_eq!(value["status"], "done");
        assert_eq!(value["result"], 42.0);
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_missing_expression() {
        let store = ExpressionStore::new();
        assert!(store.summary("nope").is_none());
        assert!(!store.complete("nope", 1.0));
        assert!(store.is_empty());
    }
}
