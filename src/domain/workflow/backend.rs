//! Workflow backend capability

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::spec::WorkflowSpec;
use super::status::WorkflowObject;
use crate::domain::DomainError;

/// The remote execution engine that accepts specifications and reports status.
///
/// Implementations must tolerate sequential reuse across polls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Submit a specification; the returned object identifies the new workflow
    async fn create(&self, spec: &WorkflowSpec) -> Result<WorkflowObject, DomainError>;

    /// Fetch the current state of a workflow
    async fn get(&self, namespace: &str, name: &str) -> Result<WorkflowObject, DomainError>;

    /// List workflows matching a label selector; an empty selector matches all
    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<WorkflowObject>, DomainError>;

    /// Delete a workflow
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), DomainError>;
}
