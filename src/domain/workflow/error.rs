//! Workflow error types

use thiserror::Error;

use super::status::{WorkflowObject, WorkflowPhase};

/// Errors that can occur while composing, submitting or awaiting a workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    /// A component's step, group, template or metrics producer failed
    #[error("Composition failed: {0}")]
    Composition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entrypoint not found: {0}")]
    EntrypointNotFound(String),

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Status query failed: {0}")]
    Query(String),

    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend reported a failed or errored phase
    #[error("Workflow '{name}' finished with phase {phase}: {message}")]
    TerminalFailure {
        name: String,
        phase: WorkflowPhase,
        message: String,
        workflow: Box<WorkflowObject>,
    },

    /// No terminal phase was observed before the deadline; carries the
    /// object returned at submission time
    #[error("Timed out after {timeout_ms}ms waiting for workflow '{name}'")]
    Timeout {
        name: String,
        timeout_ms: u64,
        workflow: Box<WorkflowObject>,
    },
}

impl WorkflowError {
    pub fn composition(message: impl Into<String>) -> Self {
        Self::Composition(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn entrypoint_not_found(name: impl Into<String>) -> Self {
        Self::EntrypointNotFound(name.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Build a terminal failure from the last polled object
    pub fn terminal_failure(workflow: WorkflowObject) -> Self {
        let status = workflow.status();
        let message = status
            .message()
            .filter(|m| !m.is_empty())
            .unwrap_or("no message reported")
            .to_string();

        Self::TerminalFailure {
            name: workflow.name().to_string(),
            phase: status.phase().clone(),
            message,
            workflow: Box::new(workflow),
        }
    }

    pub fn timeout(workflow: WorkflowObject, timeout_ms: u64) -> Self {
        Self::Timeout {
            name: workflow.name().to_string(),
            timeout_ms,
            workflow: Box::new(workflow),
        }
    }

    /// The workflow object paired with this error, if any
    pub fn workflow(&self) -> Option<&WorkflowObject> {
        match self {
            Self::TerminalFailure { workflow, .. } | Self::Timeout { workflow, .. } => {
                Some(workflow)
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
