//! Workflow backend backed by a workflow server's REST API

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::manifest::{parse_workflow, parse_workflow_list, render_manifest};
use crate::domain::workflow::{WorkflowBackend, WorkflowObject, WorkflowSpec};
use crate::domain::DomainError;

/// Maximum length of a namespace or workflow name
pub const MAX_NAME_LENGTH: usize = 253;

/// Lowercase alphanumerics, hyphens and dots, starting and ending alphanumeric
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$").unwrap());

/// Validate a namespace or workflow name before it is placed in a URL path
pub fn validate_resource_name(kind: &str, name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", kind)));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "{} exceeds maximum length of {} characters",
            kind, MAX_NAME_LENGTH
        )));
    }

    if !NAME_PATTERN.is_match(name) {
        return Err(DomainError::validation(format!(
            "Invalid {} '{}': must be lowercase alphanumeric with hyphens or dots",
            kind.to_lowercase(),
            name
        )));
    }

    Ok(())
}

/// Configuration for the HTTP backend
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Server base URL, e.g. `https://workflows.example.com:2746`
    pub base_url: String,
    /// Used when a specification carries no namespace
    pub default_namespace: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2746".to_string(),
            default_namespace: "default".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// HTTP workflow backend using reqwest
#[derive(Debug, Clone)]
pub struct HttpWorkflowBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpWorkflowBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn collection_url(&self, namespace: &str) -> Result<String, DomainError> {
        validate_resource_name("Namespace", namespace)?;
        Ok(format!(
            "{}/api/v1/workflows/{}",
            self.config.base_url.trim_end_matches('/'),
            namespace
        ))
    }

    fn item_url(&self, namespace: &str, name: &str) -> Result<String, DomainError> {
        validate_resource_name("Workflow name", name)?;
        Ok(format!("{}/{}", self.collection_url(namespace)?, name))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the JSON body; 404 maps to not-found
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value, DomainError> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::provider("http", format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DomainError::not_found(format!("{} not found", what)));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                "http",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        let body = response.text().await.map_err(|e| {
            DomainError::provider("http", format!("Failed to read response: {}", e))
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| DomainError::provider("http", format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl WorkflowBackend for HttpWorkflowBackend {
    async fn create(&self, spec: &WorkflowSpec) -> Result<WorkflowObject, DomainError> {
        let namespace = if spec.namespace().is_empty() {
            self.config.default_namespace.as_str()
        } else {
            spec.namespace()
        };
        let url = self.collection_url(namespace)?;
        let manifest = render_manifest(spec, namespace)?;

        debug!(url = %url, "Creating workflow");
        let request = self
            .request(Method::POST, &url)
            .json(&json!({ "workflow": manifest }));

        parse_workflow(self.send(request, "Namespace").await?)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<WorkflowObject, DomainError> {
        let url = self.item_url(namespace, name)?;

        debug!(url = %url, "Fetching workflow");
        let what = format!("Workflow '{}/{}'", namespace, name);
        parse_workflow(self.send(self.request(Method::GET, &url), &what).await?)
    }

    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<WorkflowObject>, DomainError> {
        let url = self.collection_url(namespace)?;

        let mut request = self.request(Method::GET, &url);
        if !label_selector.is_empty() {
            request = request.query(&[("listOptions.labelSelector", label_selector)]);
        }

        debug!(url = %url, selector = label_selector, "Listing workflows");
        parse_workflow_list(self.send(request, "Namespace").await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), DomainError> {
        let url = self.item_url(namespace, name)?;

        debug!(url = %url, "Deleting workflow");
        let what = format!("Workflow '{}/{}'", namespace, name);
        self.send(self.request(Method::DELETE, &url), &what).await?;
        Ok(())
    }
}
