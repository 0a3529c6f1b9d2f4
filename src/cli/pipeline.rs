//! Pipeline description files
//!
//! A pipeline file lists stages in order; each stage is either a single
//! container step or a `parallel` fan-out of container steps. Exit handlers
//! run after the stages regardless of their outcome.
//!
//! ```json
//! {
//!   "generateName": "ci-",
//!   "labels": { "team": "platform" },
//!   "stages": [
//!     { "name": "build", "image": "rust:1.80", "command": ["cargo", "build"] },
//!     { "parallel": [
//!       { "name": "lint", "image": "rust:1.80", "command": ["cargo", "clippy"] },
//!       { "name": "test", "image": "rust:1.80", "command": ["cargo", "test"] }
//!     ] }
//!   ],
//!   "exitHandlers": [
//!     { "name": "cleanup", "image": "alpine", "command": ["sh", "-c", "echo done"] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::domain::workflow::{
    ContainerStep, ParallelContainers, RetryStrategy, WorkflowBuilder, WorkflowMetrics,
    WorkflowSpec,
};

/// One stage of the main sequence
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Stage {
    Parallel { parallel: ParallelContainers },
    Single(ContainerStep),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFile {
    pub generate_name: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub service_account: Option<String>,

    #[serde(default)]
    pub parallelism: Option<u32>,

    #[serde(default)]
    pub archive_logs: bool,

    #[serde(default)]
    pub default_retry: Option<RetryStrategy>,

    #[serde(default)]
    pub ttl_seconds: Option<u64>,

    #[serde(default)]
    pub active_deadline_seconds: Option<u64>,

    #[serde(default)]
    pub stages: Vec<Stage>,

    #[serde(default)]
    pub exit_handlers: Vec<ContainerStep>,

    #[serde(default)]
    pub metrics: Option<WorkflowMetrics>,
}

impl PipelineFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid pipeline file {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Compose the pipeline; `namespace` applies when the file names none
    pub fn builder(&self, namespace: &str) -> WorkflowBuilder {
        let mut builder = WorkflowBuilder::new(&self.generate_name)
            .with_namespace(self.namespace.as_deref().unwrap_or(namespace))
            .with_archive_logs(self.archive_logs);

        for (key, value) in &self.labels {
            builder = builder.with_label(key, value);
        }
        if let Some(service_account) = &self.service_account {
            builder = builder.with_service_account(service_account);
        }
        if let Some(parallelism) = self.parallelism {
            builder = builder.with_parallelism(parallelism);
        }
        if let Some(retry) = &self.default_retry {
            builder = builder.with_default_retry(retry.clone());
        }
        if let Some(ttl) = self.ttl_seconds {
            builder = builder.with_ttl_seconds(ttl);
        }
        if let Some(deadline) = self.active_deadline_seconds {
            builder = builder.with_active_deadline_seconds(deadline);
        }

        for stage in &self.stages {
            match stage {
                Stage::Single(step) => builder.add(step),
                Stage::Parallel { parallel } => builder.add_parallel(parallel),
            };
        }
        for handler in &self.exit_handlers {
            builder.add_exit_handler(handler);
        }
        if let Some(metrics) = &self.metrics {
            builder.with_metrics(metrics);
        }

        builder
    }

    pub fn build(&self, namespace: &str) -> anyhow::Result<WorkflowSpec> {
        Ok(self.builder(namespace).build()?)
    }
}
