//! Steps and parallel step groups

use serde::{Deserialize, Serialize};

/// Continuation policy: proceed with the workflow even if the step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContinueOn {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl ContinueOn {
    /// Continue when the step fails or errors
    pub fn always() -> Self {
        Self {
            failed: true,
            error: true,
        }
    }

    pub fn on_failed() -> Self {
        Self {
            failed: true,
            error: false,
        }
    }

    pub fn on_error() -> Self {
        Self {
            failed: false,
            error: true,
        }
    }
}

/// A reference to a template by name, optionally guarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    name: String,

    template: String,

    /// Guard expression evaluated by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    when: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    continue_on: Option<ContinueOn>,
}

impl Step {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            when: None,
            continue_on: None,
        }
    }

    pub fn with_when(mut self, condition: impl Into<String>) -> Self {
        self.when = Some(condition.into());
        self
    }

    pub fn with_continue_on(mut self, continue_on: ContinueOn) -> Self {
        self.continue_on = Some(continue_on);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn when(&self) -> Option<&str> {
        self.when.as_deref()
    }

    pub fn continue_on(&self) -> Option<ContinueOn> {
        self.continue_on
    }
}

/// Steps that run concurrently. Groups in a sequence run one after another.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParallelStepGroup(Vec<Step>);

impl ParallelStepGroup {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    /// A group holding exactly one step
    pub fn single(step: Step) -> Self {
        Self(vec![step])
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Step>> for ParallelStepGroup {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}

impl FromIterator<Step> for ParallelStepGroup {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serialization() {
        let step = Step::new("test", "test-template")
            .with_when("{{workflow.status}} == Succeeded")
            .with_continue_on(ContinueOn::on_failed());

        let json = serde_json::to_value(&step).unwrap();

        assert_eq!(json["name"], "test");
        assert_eq!(json["template"], "test-template");
        assert_eq!(json["when"], "{{workflow.status}} == Succeeded");
        assert_eq!(json["continueOn"]["failed"], true);
        assert!(json["continueOn"].get("error").is_none());
    }

    #[test]
    fn test_plain_step_omits_optional_fields() {
        let json = serde_json::to_value(Step::new("build", "build-template")).unwrap();
        assert!(json.get("when").is_none());
        assert!(json.get("continueOn").is_none());
    }

    #[test]
    fn test_group_serializes_as_list() {
        let group: ParallelStepGroup = vec![Step::new("a", "t"), Step::new("b", "t")].into();
        let json = serde_json::to_value(&group).unwrap();

        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(group.len(), 2);
    }
}
