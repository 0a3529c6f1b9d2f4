//! Workflow composition and lifecycle
//!
//! A [`WorkflowBuilder`] turns components into an immutable [`WorkflowSpec`]:
//! - templates are registered once per name, first registration wins
//! - sequential components append one group per step to the main sequence
//! - parallel components append their groups unchanged
//! - exit-handler steps form a separate sequence, with `cleanup`/`destroy`
//!   steps moved to its front
//!
//! A [`WorkflowClient`] submits specifications to a [`WorkflowBackend`] and
//! polls them until they succeed, fail or time out.

pub mod backend;
mod builder;
mod component;
mod components;
mod error;
mod lifecycle;
mod metrics;
mod registry;
mod spec;
mod status;
mod step;
mod template;

pub use backend::WorkflowBackend;
pub use builder::{
    is_cleanup_priority, WorkflowBuilder, EXIT_HANDLER_TEMPLATE_NAME, MAIN_TEMPLATE_NAME,
};
pub use component::{Component, MetricsProvider, ParallelComponent};
pub use components::{ContainerStep, ParallelContainers};
pub use error::WorkflowError;
pub use lifecycle::{WorkflowClient, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use metrics::{MetricKind, MetricLabel, PrometheusMetric, WorkflowMetrics};
pub use registry::TemplateRegistry;
pub use spec::{WorkflowMetadata, WorkflowOptions, WorkflowSpec};
pub use status::{WorkflowObject, WorkflowPhase, WorkflowStatus};
pub use step::{ContinueOn, ParallelStepGroup, Step};
pub use template::{
    Backoff, ContainerSpec, EnvVar, ResourceRequirements, RetryPolicy, RetryStrategy,
    ScriptSpec, SuspendSpec, Template, TemplateBody,
};
