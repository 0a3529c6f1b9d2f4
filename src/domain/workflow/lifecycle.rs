//! Submit-and-await lifecycle driver

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::backend::WorkflowBackend;
use super::error::WorkflowError;
use super::spec::WorkflowSpec;
use super::status::{WorkflowObject, WorkflowPhase, WorkflowStatus};
use crate::domain::DomainError;

/// Interval between status queries while waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Lower bound for the polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Submits specifications and follows them to a terminal phase
#[derive(Clone)]
pub struct WorkflowClient {
    backend: Arc<dyn WorkflowBackend>,
    poll_interval: Duration,
}

impl WorkflowClient {
    pub fn new(backend: Arc<dyn WorkflowBackend>) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the polling interval; anything below [`MIN_POLL_INTERVAL`] is raised to it
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Send the specification to the backend. Errors are returned as-is, no retry.
    pub async fn submit(&self, spec: &WorkflowSpec) -> Result<WorkflowObject, WorkflowError> {
        let created = self
            .backend
            .create(spec)
            .await
            .map_err(|e| WorkflowError::submission(e.to_string()))?;

        info!(
            workflow = created.name(),
            namespace = created.namespace(),
            "Workflow submitted"
        );
        Ok(created)
    }

    /// Submit, then poll until the workflow reaches a terminal phase or
    /// `timeout` elapses.
    ///
    /// A succeeded workflow is returned as `Ok` with the latest polled object.
    /// A failed or errored one yields [`WorkflowError::TerminalFailure`]
    /// carrying that object. On timeout the error carries the object returned
    /// at submission, not the last polled one. Failed status queries are
    /// logged and polling continues.
    pub async fn submit_and_wait(
        &self,
        spec: &WorkflowSpec,
        timeout: Duration,
    ) -> Result<WorkflowObject, WorkflowError> {
        self.submit_and_wait_until(spec, timeout, std::future::pending())
            .await
    }

    /// Like [`submit_and_wait`](Self::submit_and_wait), additionally stopping
    /// when `cancel` completes. Cancellation is reported as a timeout.
    pub async fn submit_and_wait_until<F>(
        &self,
        spec: &WorkflowSpec,
        timeout: Duration,
        cancel: F,
    ) -> Result<WorkflowObject, WorkflowError>
    where
        F: Future<Output = ()>,
    {
        let submitted = self.submit(spec).await?;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        // In-flight status queries are raced against the deadline and cancellation
        let polling = async {
            let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Some(outcome) = self.poll_once(&submitted).await {
                    return outcome;
                }
            }
        };

        tokio::select! {
            outcome = polling => outcome,
            _ = &mut deadline => {
                warn!(workflow = submitted.name(), timeout_ms, "Timed out waiting for workflow");
                Err(WorkflowError::timeout(submitted.clone(), timeout_ms))
            }
            _ = &mut cancel => {
                warn!(workflow = submitted.name(), "Wait for workflow cancelled");
                Err(WorkflowError::timeout(submitted.clone(), timeout_ms))
            }
        }
    }

    /// Current status of a workflow
    pub async fn get_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkflowStatus, WorkflowError> {
        let workflow = self
            .backend
            .get(namespace, name)
            .await
            .map_err(|e| map_lookup_error(e, name, WorkflowError::Query))?;

        Ok(workflow.status().clone())
    }

    pub async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<WorkflowObject>, WorkflowError> {
        self.backend
            .list(namespace, label_selector)
            .await
            .map_err(|e| WorkflowError::backend(e.to_string()))
    }

    pub async fn delete(&self, namespace: &str, name: &str) -> Result<(), WorkflowError> {
        self.backend
            .delete(namespace, name)
            .await
            .map_err(|e| map_lookup_error(e, name, WorkflowError::Backend))?;

        info!(workflow = name, namespace, "Workflow deleted");
        Ok(())
    }

    /// One status query; `None` means keep polling
    async fn poll_once(
        &self,
        submitted: &WorkflowObject,
    ) -> Option<Result<WorkflowObject, WorkflowError>> {
        let current = match self
            .backend
            .get(submitted.namespace(), submitted.name())
            .await
        {
            Ok(current) => current,
            Err(e) => {
                warn!(
                    workflow = submitted.name(),
                    error = %e,
                    "Failed to query workflow status, retrying"
                );
                return None;
            }
        };

        let phase = current.phase().clone();
        match phase {
            WorkflowPhase::Succeeded => {
                info!(workflow = current.name(), "Workflow succeeded");
                Some(Ok(current))
            }
            WorkflowPhase::Failed | WorkflowPhase::Error => {
                warn!(workflow = current.name(), phase = %phase, "Workflow finished unsuccessfully");
                Some(Err(WorkflowError::terminal_failure(current)))
            }
            _ => {
                debug!(workflow = current.name(), phase = %phase, "Workflow still in progress");
                None
            }
        }
    }
}

impl fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn map_lookup_error(
    error: DomainError,
    name: &str,
    otherwise: fn(String) -> WorkflowError,
) -> WorkflowError {
    match error {
        DomainError::NotFound { .. } => WorkflowError::not_found(name),
        other => otherwise(other.to_string()),
    }
}
