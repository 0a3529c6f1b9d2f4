//! In-memory workflow backend for offline use and tests

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::manifest::render_manifest;
use crate::domain::workflow::{WorkflowBackend, WorkflowObject, WorkflowSpec, WorkflowStatus};
use crate::domain::DomainError;

const NAME_SUFFIX_LENGTH: usize = 5;

#[derive(Debug, Clone)]
struct StoredWorkflow {
    object: WorkflowObject,
    manifest: Value,
}

/// Keeps submitted workflows in memory. Nothing runs: phases only change
/// through [`InMemoryWorkflowBackend::set_status`].
#[derive(Debug)]
pub struct InMemoryWorkflowBackend {
    default_namespace: String,
    workflows: RwLock<HashMap<(String, String), StoredWorkflow>>,
}

impl InMemoryWorkflowBackend {
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the status of a stored workflow
    pub async fn set_status(
        &self,
        namespace: &str,
        name: &str,
        status: WorkflowStatus,
    ) -> Result<(), DomainError> {
        let mut workflows = self.workflows.write().await;
        let stored = workflows
            .get_mut(&key(namespace, name))
            .ok_or_else(|| not_found(namespace, name))?;

        stored.object.set_status(status);
        Ok(())
    }

    /// The rendered manifest a workflow was submitted with
    pub async fn manifest(&self, namespace: &str, name: &str) -> Option<Value> {
        let workflows = self.workflows.read().await;
        workflows
            .get(&key(namespace, name))
            .map(|stored| stored.manifest.clone())
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }
}

impl Default for InMemoryWorkflowBackend {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl WorkflowBackend for InMemoryWorkflowBackend {
    async fn create(&self, spec: &WorkflowSpec) -> Result<WorkflowObject, DomainError> {
        if spec.generate_name().is_empty() {
            return Err(DomainError::validation("Workflow requires a generate name"));
        }

        let namespace = if spec.namespace().is_empty() {
            self.default_namespace.clone()
        } else {
            spec.namespace().to_string()
        };
        let name = format!("{}{}", spec.generate_name(), name_suffix());
        let manifest = render_manifest(spec, &namespace)?;

        let object = WorkflowObject::new(&name, &namespace).with_labels(spec.labels().clone());

        debug!(workflow = %name, namespace = %namespace, "Storing workflow");
        self.workflows.write().await.insert(
            (namespace, name),
            StoredWorkflow {
                object: object.clone(),
                manifest,
            },
        );

        Ok(object)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<WorkflowObject, DomainError> {
        let workflows = self.workflows.read().await;
        workflows
            .get(&key(namespace, name))
            .map(|stored| stored.object.clone())
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<WorkflowObject>, DomainError> {
        let requirements = parse_selector(label_selector)?;
        let workflows = self.workflows.read().await;

        let mut matching: Vec<WorkflowObject> = workflows
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, stored)| &stored.object)
            .filter(|object| requirements.iter().all(|r| r.matches(object)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(matching)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), DomainError> {
        self.workflows
            .write()
            .await
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found(namespace, name))
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

fn not_found(namespace: &str, name: &str) -> DomainError {
    DomainError::not_found(format!("Workflow '{}/{}' not found", namespace, name))
}

fn name_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..NAME_SUFFIX_LENGTH].to_string()
}

/// One comma-separated term of an equality-based label selector
#[derive(Debug, Clone, PartialEq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(&self, object: &WorkflowObject) -> bool {
        let labels = object.labels();
        match self {
            Self::Equals(k, v) => labels.get(k) == Some(v),
            Self::NotEquals(k, v) => labels.get(k) != Some(v),
            Self::Exists(k) => labels.contains_key(k),
            Self::NotExists(k) => !labels.contains_key(k),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Vec<Requirement>, DomainError> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(parse_requirement)
        .collect()
}

fn parse_requirement(term: &str) -> Result<Requirement, DomainError> {
    let requirement = if let Some((k, v)) = term.split_once("!=") {
        Requirement::NotEquals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = term.split_once("==") {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else if let Some((k, v)) = term.split_once('=') {
        Requirement::Equals(k.trim().to_string(), v.trim().to_string())
    } else if let Some(k) = term.strip_prefix('!') {
        Requirement::NotExists(k.trim().to_string())
    } else {
        Requirement::Exists(term.to_string())
    };

    let key = match &requirement {
        Requirement::Equals(k, _)
        | Requirement::NotEquals(k, _)
        | Requirement::Exists(k)
        | Requirement::NotExists(k) => k,
    };
    if key.is_empty() {
        return Err(DomainError::validation(format!(
            "Invalid label selector term '{}'",
            term
        )));
    }

    Ok(requirement)
}
