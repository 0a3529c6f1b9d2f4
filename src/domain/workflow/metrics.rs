//! Prometheus metric definitions attached to a workflow

use serde::{Deserialize, Serialize};

/// Label attached to an emitted metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLabel {
    pub key: String,
    pub value: String,
}

/// Kind and value expression of a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Gauge {
        value: String,
        #[serde(default)]
        realtime: bool,
    },
    Counter {
        value: String,
    },
    Histogram {
        value: String,
        buckets: Vec<f64>,
    },
}

/// A metric the backend emits for a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusMetric {
    pub name: String,
    pub help: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<MetricLabel>,

    /// Emit only when this condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    #[serde(flatten)]
    pub kind: MetricKind,
}

impl PrometheusMetric {
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            when: None,
            kind,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(MetricLabel {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_when(mut self, condition: impl Into<String>) -> Self {
        self.when = Some(condition.into());
        self
    }
}

/// Metrics block of a specification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub prometheus: Vec<PrometheusMetric>,
}

impl WorkflowMetrics {
    pub fn new(prometheus: Vec<PrometheusMetric>) -> Self {
        Self { prometheus }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_serialization() {
        let metric = PrometheusMetric::new(
            "duration_seconds",
            "Workflow duration",
            MetricKind::Gauge {
                value: "{{workflow.duration}}".to_string(),
                realtime: true,
            },
        )
        .with_label("pipeline", "ci");

        let json = serde_json::to_value(&metric).unwrap();

        assert_eq!(json["name"], "duration_seconds");
        assert_eq!(json["gauge"]["realtime"], true);
        assert_eq!(json["labels"][0]["key"], "pipeline");
        assert!(json.get("when").is_none());
    }
}
