use thiserror::Error;

use crate::scheduler::model::TaskId;

/// Unified error type for the orchestrator core and its outer layers
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Submission carried no expression text
    #[error("Expression is empty")]
    EmptyExpression,

    /// Submission reused the id of an expression that is already registered
    #[error("Expression already exists: {id}")]
    DuplicateId { id: String },

    /// Malformed infix text (mismatched parentheses, unknown token, empty input)
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    /// Well-formed tokens that do not describe a computable expression
    #[error("Semantic error: {message}")]
    Semantic { message: String },

    #[error("Expression not found: {id}")]
    ExpressionNotFound { id: String },

    /// The task was never created or has already been reclaimed by a cascade
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: TaskId },

    /// The task is live but is not waiting for a worker report
    #[error("Task {task_id} is not awaiting a result: {reason}")]
    TaskNotAwaitingResult { task_id: TaskId, reason: String },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OrchestratorError {
    /// Create a syntax error without a known position
    pub fn syntax<S: Into<String>>(message: S) -> Self {
        Self::Syntax {
            message: message.into(),
            position: None,
        }
    }

    /// Create a syntax error pointing at a byte offset of the source text
    pub fn syntax_at<S: Into<String>>(message: S, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn semantic<S: Into<String>>(message: S) -> Self {
        Self::Semantic {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error tied to a named setting
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Errors caused by the caller's input rather than by the orchestrator
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Configuration { .. } | Self::Internal { .. })
    }

    /// Errors a worker may safely ignore.
    ///
    /// Cascades reclaim tasks before every worker has reported, so a result
    /// for a reclaimed task is expected traffic rather than a fault.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyExpression | Self::Syntax { .. } => "syntax",
            Self::Semantic { .. } => "semantic",
            Self::DuplicateId { .. } => "duplicate",
            Self::ExpressionNotFound { .. } | Self::TaskNotFound { .. } => "not_found",
            Self::TaskNotAwaitingResult { .. } => "conflict",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OrchestratorError::syntax_at("unknown token '%'", 3);
        assert!(matches!(
            err,
            OrchestratorError::Syntax {
                position: Some(3),
                ..
            }
        ));
        assert_eq!(err.category(), "syntax");
        assert!(err.to_string().contains("unknown token"));
    }

    #[test]
    fn test_error_classification() {
        assert!(OrchestratorError::TaskNotFound { task_id: 7 }.is_benign());
        assert!(!OrchestratorError::semantic("division by zero").is_benign());
        assert!(OrchestratorError::DuplicateId { id: "a".into() }.is_client_error());
        assert!(!OrchestratorError::internal("lock poisoned").is_client_error());
        assert!(!OrchestratorError::configuration("bad port").is_client_error());
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::TaskNotAwaitingResult {
            task_id: 12,
            reason: "already completed".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("12"));
        assert!(display.contains("already completed"));

        let err = OrchestratorError::configuration_field("invalid port", "ORCHESTRATOR_PORT");
        assert!(matches!(
            err,
            OrchestratorError::Configuration { field: Some(ref f), .. } if f == "ORCHESTRATOR_PORT"
        ));
    }
}
