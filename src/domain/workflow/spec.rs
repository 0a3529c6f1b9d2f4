//! The finalized workflow specification

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metrics::WorkflowMetrics;
use super::step::ParallelStepGroup;
use super::template::{RetryStrategy, Template};

/// Identity and placement of a workflow
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    /// Prefix the backend completes into a unique name
    pub generate_name: String,

    /// Empty means the client's default namespace
    #[serde(default)]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Run-level settings carried alongside the templates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Maximum number of concurrently running steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,

    #[serde(default)]
    pub archive_logs: bool,

    /// Applied to templates that declare no retry strategy of their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_retry: Option<RetryStrategy>,

    /// Seconds to keep the finished workflow before the backend deletes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<u64>,

    /// Wall-clock deadline for the whole run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<u64>,
}

/// An immutable, finalized workflow specification.
///
/// Produced by [`WorkflowBuilder::build`](super::WorkflowBuilder::build) or
/// [`WorkflowBuilder::build_with_entrypoint`](super::WorkflowBuilder::build_with_entrypoint).
/// Only serialized; the builder is the sole way to obtain one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    metadata: WorkflowMetadata,
    entrypoint: String,
    templates: Vec<Template>,
    main_groups: Vec<ParallelStepGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_handler_name: Option<String>,

    #[serde(default)]
    options: WorkflowOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics: Option<WorkflowMetrics>,
}

impl WorkflowSpec {
    pub(crate) fn new(
        metadata: WorkflowMetadata,
        entrypoint: String,
        templates: Vec<Template>,
        main_groups: Vec<ParallelStepGroup>,
        exit_handler_name: Option<String>,
        options: WorkflowOptions,
        metrics: Option<WorkflowMetrics>,
    ) -> Self {
        Self {
            metadata,
            entrypoint,
            templates,
            main_groups,
            exit_handler_name,
            options,
            metrics,
        }
    }

    pub fn metadata(&self) -> &WorkflowMetadata {
        &self.metadata
    }

    pub fn generate_name(&self) -> &str {
        &self.metadata.generate_name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }

    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn main_groups(&self) -> &[ParallelStepGroup] {
        &self.main_groups
    }

    pub fn exit_handler_name(&self) -> Option<&str> {
        self.exit_handler_name.as_deref()
    }

    /// Groups of the exit-handler template, empty when there is none
    pub fn exit_groups(&self) -> &[ParallelStepGroup] {
        self.exit_handler_name
            .as_deref()
            .and_then(|name| self.template(name))
            .and_then(Template::step_groups)
            .unwrap_or(&[])
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn metrics(&self) -> Option<&WorkflowMetrics> {
        self.metrics.as_ref()
    }
}
