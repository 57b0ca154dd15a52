use std::sync::Arc;
use tracing::{debug, info};

use crate::compiler;
use crate::core::config::OrchestratorConfig;
use crate::core::errors::{OrchestratorError, Result};
use crate::core::ids::{Cuid2Generator, IdGenerator};
use crate::scheduler::{ExpressionSummary, Scheduler, SchedulerStats, TaskId, TaskPayload};

/// Entry point used by the transport layer.
///
/// Every operation is non-blocking and safe to call from any number of
/// threads or tasks at once.
pub struct Orchestrator {
    config: OrchestratorConfig,
    scheduler: Scheduler,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Compile `text` and register it under `id`, generating an id when none
    /// (or a blank one) is given.
    ///
    /// Literal expressions are done immediately. Compile failures register
    /// nothing.
    pub fn submit_expression(&self, id: Option<String>, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(OrchestratorError::EmptyExpression);
        }

        let id = match id.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => self.ids.next_id(),
        };

        // `admit` repeats this check under the table lock
        if self.scheduler.has_expression(&id) {
            return Err(OrchestratorError::DuplicateId { id });
        }

        let compiled = compiler::compile(text).map_err(|e| {
            info!("Expression {} rejected ({}): {}", id, e.category(), e);
            e
        })?;
        self.scheduler.admit(&id, text, compiled)?;
        Ok(id)
    }

    /// Snapshot of all expressions, unordered
    pub fn list_expressions(&self) -> Vec<ExpressionSummary> {
        self.scheduler.expressions()
    }

    pub fn get_expression(&self, id: &str) -> Result<ExpressionSummary> {
        self.scheduler.expression(id)
    }

    /// Next ready task for a worker, or `None` when nothing is ready
    pub fn pull_task(&self) -> Result<Option<TaskPayload>> {
        let task = self.scheduler.pull_next_task()?;
        if task.is_none() {
            debug!("No task available");
        }
        Ok(task)
    }

    pub fn submit_result(&self, task_id: TaskId, value: f64) -> Result<()> {
        self.scheduler.submit_result(task_id, value)
    }

    pub fn stats(&self) -> Result<SchedulerStats> {
        self.scheduler.stats()
    }
}

/// Builder for Orchestrator
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<OrchestratorConfig>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl OrchestratorBuilder {
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default cuid2 generator used for unnamed submissions
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config.unwrap_or_default();
        Orchestrator {
            scheduler: Scheduler::from_config(&config),
            config,
            ids: self.ids.unwrap_or_else(|| Arc::new(Cuid2Generator)),
        }
    }
}
