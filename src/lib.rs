//! Workflow Composer
//!
//! Client-side composition and lifecycle management for a remote workflow
//! execution backend:
//! - Build immutable workflow specifications from reusable components
//! - Sequential and parallel step groups, exit handlers with cleanup priority
//! - Submit to a workflow server and wait for a terminal phase
//! - HTTP and in-memory backends, selected by configuration

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::workflow::{
    Component, MetricsProvider, ParallelComponent, WorkflowBackend, WorkflowBuilder,
    WorkflowClient, WorkflowError, WorkflowSpec,
};
pub use domain::DomainError;
