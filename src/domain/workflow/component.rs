//! Capabilities consumed by the workflow builder
//!
//! Components are the callers' building blocks: each yields the steps (or
//! parallel groups) it wants to run together with the templates those steps
//! reference. The capabilities are additive; a type may implement any of them.

use super::error::WorkflowError;
use super::metrics::WorkflowMetrics;
use super::step::{ParallelStepGroup, Step};
use super::template::Template;

/// Yields steps that run one after another
pub trait Component {
    fn steps(&self) -> Result<Vec<Step>, WorkflowError>;

    fn templates(&self) -> Result<Vec<Template>, WorkflowError>;
}

/// Yields groups of steps; steps within one group run concurrently
pub trait ParallelComponent {
    fn parallel_groups(&self) -> Result<Vec<ParallelStepGroup>, WorkflowError>;

    fn templates(&self) -> Result<Vec<Template>, WorkflowError>;
}

/// Supplies the metrics block of a specification
pub trait MetricsProvider {
    fn metrics(&self) -> Result<WorkflowMetrics, WorkflowError>;
}

impl MetricsProvider for WorkflowMetrics {
    fn metrics(&self) -> Result<WorkflowMetrics, WorkflowError> {
        Ok(self.clone())
    }
}
