//! Ready-made container components

use serde::{Deserialize, Serialize};

use super::component::{Component, ParallelComponent};
use super::error::WorkflowError;
use super::step::{ContinueOn, ParallelStepGroup, Step};
use super::template::{ContainerSpec, RetryStrategy, Template};

/// One step named `<name>` running a container through template `<name>-template`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStep {
    name: String,

    #[serde(flatten)]
    container: ContainerSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    when: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    continue_on: Option<ContinueOn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_strategy: Option<RetryStrategy>,
}

impl ContainerStep {
    pub fn new(name: impl Into<String>, container: ContainerSpec) -> Self {
        Self {
            name: name.into(),
            container,
            when: None,
            continue_on: None,
            retry_strategy: None,
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

    pub fn with_retry_strategy(mut self, retry_strategy: RetryStrategy) -> Self {
        self.retry_strategy = Some(retry_strategy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_name(&self) -> String {
        format!("{}-template", self.name)
    }

    fn step(&self) -> Result<Step, WorkflowError> {
        self.validate()?;

        let mut step = Step::new(&self.name, self.template_name());
        if let Some(when) = &self.when {
            step = step.with_when(when);
        }
        if let Some(continue_on) = self.continue_on {
            step = step.with_continue_on(continue_on);
        }
        Ok(step)
    }

    fn template(&self) -> Result<Template, WorkflowError> {
        self.validate()?;

        let template = Template::container(self.template_name(), self.container.clone());
        Ok(match &self.retry_strategy {
            Some(retry) => template.with_retry_strategy(retry.clone()),
            None => template,
        })
    }

    fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::composition("Container step requires a name"));
        }
        if self.container.image.trim().is_empty() {
            return Err(WorkflowError::composition(format!(
                "Container step '{}' requires an image",
                self.name
            )));
        }
        Ok(())
    }
}

impl Component for ContainerStep {
    fn steps(&self) -> Result<Vec<Step>, WorkflowError> {
        Ok(vec![self.step()?])
    }

    fn templates(&self) -> Result<Vec<Template>, WorkflowError> {
        Ok(vec![self.template()?])
    }
}

/// Fan-out: container steps that all run in one parallel group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParallelContainers {
    steps: Vec<ContainerStep>,
}

impl ParallelContainers {
    pub fn new(steps: Vec<ContainerStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[ContainerStep] {
        &self.steps
    }
}

impl ParallelComponent for ParallelContainers {
    fn parallel_groups(&self) -> Result<Vec<ParallelStepGroup>, WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::composition(
                "Parallel group requires at least one step",
            ));
        }

        let group = self
            .steps
            .iter()
            .map(ContainerStep::step)
            .collect::<Result<ParallelStepGroup, _>>()?;
        Ok(vec![group])
    }

    fn templates(&self) -> Result<Vec<Template>, WorkflowError> {
        self.steps.iter().map(ContainerStep::template).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::TemplateBody;

    #[test]
    fn test_container_step_output() {
        let component = ContainerStep::new("deploy", ContainerSpec::new("kubectl"))
            .with_when("{{workflow.parameters.env}} == prod")
            .with_continue_on(ContinueOn::always())
            .with_retry_strategy(RetryStrategy::with_limit(2));

        let steps = component.steps().unwrap();
        let templates = component.templates().unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name(), "deploy");
        assert_eq!(steps[0].template(), "deploy-template");
        assert!(steps[0].when().is_some());
        assert_eq!(steps[0].continue_on(), Some(ContinueOn::always()));

        assert_eq!(templates[0].name(), "deploy-template");
        assert!(matches!(templates[0].body(), TemplateBody::Container(c) if c.image == "kubectl"));
        assert_eq!(templates[0].retry_strategy().and_then(|r| r.limit), Some(2));
    }

    #[test]
    fn test_container_step_requires_image() {
        let component = ContainerStep::new("deploy", ContainerSpec::default());
        assert!(matches!(component.steps(), Err(WorkflowError::Composition(_))));
    }

    #[test]
    fn test_parallel_containers() {
        let component = ParallelContainers::new(vec![
            ContainerStep::new("shard-0", ContainerSpec::new("worker")),
            ContainerStep::new("shard-1", ContainerSpec::new("worker")),
            ContainerStep::new("shard-2", ContainerSpec::new("worker")),
        ]);

        let groups = component.parallel_groups().unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(component.templates().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_parallel_containers_fail() {
        assert!(ParallelContainers::default().parallel_groups().is_err());
    }

    #[test]
    fn test_container_step_deserialization() {
        let json = r#"{"name":"build","image":"rust:1.80","command":["cargo","build"],"continueOn":{"failed":true}}"#;
        let component: ContainerStep = serde_json::from_str(json).unwrap();

        assert_eq!(component.name(), "build");
        assert_eq!(component.templates().unwrap()[0].name(), "build-template");
        assert_eq!(component.steps().unwrap()[0].continue_on(), Some(ContinueOn::on_failed()));
    }
}
