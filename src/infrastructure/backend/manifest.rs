//! Wire mapping between specifications and workflow server resources

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::domain::workflow::{WorkflowObject, WorkflowSpec, WorkflowStatus};
use crate::domain::DomainError;

pub const API_VERSION: &str = "argoproj.io/v1alpha1";
pub const KIND: &str = "Workflow";

/// Render a specification as a workflow resource in `namespace`
pub fn render_manifest(spec: &WorkflowSpec, namespace: &str) -> Result<Value, DomainError> {
    let mut metadata = Map::new();
    metadata.insert("generateName".into(), json!(spec.generate_name()));
    metadata.insert("namespace".into(), json!(namespace));
    if !spec.labels().is_empty() {
        metadata.insert("labels".into(), serde_json::to_value(spec.labels())?);
    }

    let mut body = Map::new();
    body.insert("entrypoint".into(), json!(spec.entrypoint()));
    body.insert("templates".into(), serde_json::to_value(spec.templates())?);

    if let Some(exit_handler) = spec.exit_handler_name() {
        body.insert("onExit".into(), json!(exit_handler));
    }

    let options = spec.options();
    if let Some(service_account) = &options.service_account_name {
        body.insert("serviceAccountName".into(), json!(service_account));
    }
    if let Some(parallelism) = options.parallelism {
        body.insert("parallelism".into(), json!(parallelism));
    }
    if options.archive_logs {
        body.insert("archiveLogs".into(), json!(true));
    }
    if let Some(ttl) = options.ttl_seconds_after_finished {
        body.insert("ttlStrategy".into(), json!({ "secondsAfterCompletion": ttl }));
    }
    if let Some(deadline) = options.active_deadline_seconds {
        body.insert("activeDeadlineSeconds".into(), json!(deadline));
    }
    if let Some(metrics) = spec.metrics() {
        body.insert("metrics".into(), serde_json::to_value(metrics)?);
    }

    Ok(json!({
        "apiVersion": API_VERSION,
        "kind": KIND,
        "metadata": Value::Object(metadata),
        "spec": Value::Object(body),
    }))
}

#[derive(Debug, Deserialize)]
struct WorkflowResource {
    metadata: ResourceMetadata,

    #[serde(default)]
    status: Option<WorkflowStatus>,
}

#[derive(Debug, Deserialize)]
struct ResourceMetadata {
    name: String,

    #[serde(default)]
    namespace: String,

    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowList {
    #[serde(default)]
    items: Option<Vec<WorkflowResource>>,
}

impl From<WorkflowResource> for WorkflowObject {
    fn from(resource: WorkflowResource) -> Self {
        WorkflowObject::new(resource.metadata.name, resource.metadata.namespace)
            .with_labels(resource.metadata.labels)
            .with_status(resource.status.unwrap_or_default())
    }
}

/// Parse a single workflow resource
pub fn parse_workflow(value: Value) -> Result<WorkflowObject, DomainError> {
    let resource: WorkflowResource = serde_json::from_value(value)?;
    Ok(resource.into())
}

/// Parse a workflow list; a null item list is empty
pub fn parse_workflow_list(value: Value) -> Result<Vec<WorkflowObject>, DomainError> {
    let list: WorkflowList = serde_json::from_value(value)?;
    Ok(list
        .items
        .unwrap_or_default()
        .into_iter()
        .map(WorkflowObject::from)
        .collect())
}
