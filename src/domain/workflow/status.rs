//! Backend-reported workflow status

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution phase reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    /// Any phase this client does not know about
    Unknown(String),
}

impl WorkflowPhase {
    /// Parse a phase name, case-insensitively. Empty means not yet scheduled.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "pending" => Self::Pending,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "error" | "errored" => Self::Error,
            _ => Self::Unknown(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Error => "Error",
            Self::Unknown(value) => value,
        }
    }

    /// Polling stops once a terminal phase is observed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Error)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl From<String> for WorkflowPhase {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<WorkflowPhase> for String {
    fn from(phase: WorkflowPhase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Status block of a submitted workflow
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    #[serde(default)]
    phase: WorkflowPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl WorkflowStatus {
    pub fn new(phase: WorkflowPhase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_finished_at(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = Some(finished_at);
        self
    }

    pub fn phase(&self) -> &WorkflowPhase {
        &self.phase
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// A workflow as known to the backend: its identity plus latest status.
///
/// The object returned by a create call doubles as the handle used to poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowObject {
    name: String,
    namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,

    #[serde(default)]
    status: WorkflowStatus,
}

impl WorkflowObject {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            status: WorkflowStatus::default(),
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn status(&self) -> &WorkflowStatus {
        &self.status
    }

    pub fn phase(&self) -> &WorkflowPhase {
        &self.status.phase
    }

    pub(crate) fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse() {
        assert_eq!(WorkflowPhase::parse("Succeeded"), WorkflowPhase::Succeeded);
        assert_eq!(WorkflowPhase::parse("failed"), WorkflowPhase::Failed);
        assert_eq!(WorkflowPhase::parse("Error"), WorkflowPhase::Error);
        assert_eq!(WorkflowPhase::parse("errored"), WorkflowPhase::Error);
        assert_eq!(WorkflowPhase::parse(""), WorkflowPhase::Pending);
        assert_eq!(
            WorkflowPhase::parse("Omitted"),
            WorkflowPhase::Unknown("Omitted".to_string())
        );
    }

    #[test]
    fn test_phase_classification() {
        assert!(WorkflowPhase::Succeeded.is_terminal());
        assert!(!WorkflowPhase::Succeeded.is_failure());
        assert!(WorkflowPhase::Failed.is_failure());
        assert!(WorkflowPhase::Error.is_terminal());
        assert!(!WorkflowPhase::Running.is_terminal());
        assert!(!WorkflowPhase::Unknown("Skipped".into()).is_terminal());
    }

    #[test]
    fn test_status_serde() {
        let json = r#"{"phase":"Running","startedAt":"2024-05-01T10:00:00Z"}"#;
        let status: WorkflowStatus = serde_json::from_str(json).unwrap();

        assert_eq!(status.phase(), &WorkflowPhase::Running);
        assert!(status.started_at().is_some());
        assert!(status.finished_at().is_none());

        let serialized = serde_json::to_value(&status).unwrap();
        assert_eq!(serialized["phase"], "Running");
    }

    #[test]
    fn test_object_defaults_to_pending() {
        let object = WorkflowObject::new("wf-1", "default");
        assert_eq!(object.phase(), &WorkflowPhase::Pending);
        assert!(object.labels().is_empty());
    }
}
