//! Workflow specification builder
//!
//! Accumulates templates, the main step sequence and the exit-handler
//! sequence across any number of composition calls. Composition failures are
//! recorded rather than returned; the first one surfaces when a finalize
//! operation is called.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use super::component::{Component, MetricsProvider, ParallelComponent};
use super::error::WorkflowError;
use super::metrics::WorkflowMetrics;
use super::registry::TemplateRegistry;
use super::spec::{WorkflowMetadata, WorkflowOptions, WorkflowSpec};
use super::step::{ParallelStepGroup, Step};
use super::template::{RetryStrategy, Template};

/// Name of the template synthesized from the main sequence
pub const MAIN_TEMPLATE_NAME: &str = "main";

/// Name of the template synthesized from the exit-handler sequence
pub const EXIT_HANDLER_TEMPLATE_NAME: &str = "exit-handler";

const CLEANUP_PRIORITY_MARKERS: [&str; 2] = ["destroy", "cleanup"];

/// Whether an exit-handler step jumps to the front of the exit sequence.
/// Case-sensitive substring match.
pub fn is_cleanup_priority(step_name: &str) -> bool {
    CLEANUP_PRIORITY_MARKERS
        .iter()
        .any(|marker| step_name.contains(marker))
}

/// Builder for [`WorkflowSpec`].
///
/// One builder is owned by one caller; it is not meant to be shared across
/// threads while composing.
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    metadata: WorkflowMetadata,
    options: WorkflowOptions,
    registry: TemplateRegistry,
    main_groups: Vec<ParallelStepGroup>,
    exit_groups: VecDeque<ParallelStepGroup>,
    metrics: Option<WorkflowMetrics>,
    errors: Vec<WorkflowError>,
}

impl WorkflowBuilder {
    /// Create a builder for workflows named `<generate_name><suffix>`
    pub fn new(generate_name: impl Into<String>) -> Self {
        Self {
            metadata: WorkflowMetadata {
                generate_name: generate_name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    // Metadata

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.namespace = namespace.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_service_account(mut self, service_account: impl Into<String>) -> Self {
        self.options.service_account_name = Some(service_account.into());
        self
    }

    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.options.parallelism = Some(parallelism);
        self
    }

    pub fn with_archive_logs(mut self, archive_logs: bool) -> Self {
        self.options.archive_logs = archive_logs;
        self
    }

    pub fn with_default_retry(mut self, retry_strategy: RetryStrategy) -> Self {
        self.options.default_retry = Some(retry_strategy);
        self
    }

    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.options.ttl_seconds_after_finished = Some(seconds);
        self
    }

    pub fn with_active_deadline_seconds(mut self, seconds: u64) -> Self {
        self.options.active_deadline_seconds = Some(seconds);
        self
    }

    // Composition

    /// Append each of the component's steps as its own group, so they run
    /// strictly one after another.
    pub fn add<C: Component + ?Sized>(&mut self, component: &C) -> &mut Self {
        let steps = match component.steps() {
            Ok(steps) => steps,
            Err(e) => return self.record_error(e),
        };
        let templates = match component.templates() {
            Ok(templates) => templates,
            Err(e) => return self.record_error(e),
        };

        self.register_all(templates);
        for step in steps {
            debug!(step = step.name(), "Appending sequential step");
            self.main_groups.push(ParallelStepGroup::single(step));
        }

        self
    }

    /// Append the component's groups as-is
    pub fn add_parallel<C: ParallelComponent + ?Sized>(&mut self, component: &C) -> &mut Self {
        let groups = match component.parallel_groups() {
            Ok(groups) => groups,
            Err(e) => return self.record_error(e),
        };
        let templates = match component.templates() {
            Ok(templates) => templates,
            Err(e) => return self.record_error(e),
        };

        self.register_all(templates);
        debug!(groups = groups.len(), "Appending parallel step groups");
        self.main_groups.extend(groups);

        self
    }

    /// Add steps that run after the main sequence regardless of its outcome.
    ///
    /// Steps whose name contains `destroy` or `cleanup` are moved to the front
    /// of the exit sequence, most recently added first; all other steps keep
    /// their call order behind them.
    pub fn add_exit_handler<C: Component + ?Sized>(&mut self, component: &C) -> &mut Self {
        let steps = match component.steps() {
            Ok(steps) => steps,
            Err(e) => return self.record_error(e),
        };
        let templates = match component.templates() {
            Ok(templates) => templates,
            Err(e) => return self.record_error(e),
        };

        self.register_all(templates);
        for step in steps {
            self.push_exit_step(step);
        }

        self
    }

    /// Register a template directly, e.g. a custom entrypoint
    pub fn add_raw_template(&mut self, template: Template) -> &mut Self {
        self.registry.insert(template);
        self
    }

    pub fn with_metrics<P: MetricsProvider + ?Sized>(&mut self, provider: &P) -> &mut Self {
        match provider.metrics() {
            Ok(metrics) => self.metrics = Some(metrics),
            Err(e) => {
                self.record_error(e);
            }
        }
        self
    }

    // Finalization

    /// Finalize with a synthesized `main` template as entrypoint.
    ///
    /// Safe to call repeatedly; every call starts from a copy of the
    /// registered templates.
    pub fn build(&self) -> Result<WorkflowSpec, WorkflowError> {
        self.first_error()?;
        self.ensure_unregistered(MAIN_TEMPLATE_NAME)?;

        let mut templates = self.registry.templates().to_vec();
        templates.push(Template::steps(MAIN_TEMPLATE_NAME, self.main_groups.clone()));

        self.finalize(MAIN_TEMPLATE_NAME, templates)
    }

    /// Finalize with a caller-chosen entrypoint, which must already be registered
    pub fn build_with_entrypoint(&self, entrypoint: &str) -> Result<WorkflowSpec, WorkflowError> {
        self.first_error()?;

        if !self.registry.contains(entrypoint) {
            return Err(WorkflowError::entrypoint_not_found(entrypoint));
        }

        self.finalize(entrypoint, self.registry.templates().to_vec())
    }

    /// Current exit sequence, in execution order
    pub fn exit_groups(&self) -> impl Iterator<Item = &ParallelStepGroup> {
        self.exit_groups.iter()
    }

    pub fn main_groups(&self) -> &[ParallelStepGroup] {
        &self.main_groups
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn errors(&self) -> &[WorkflowError] {
        &self.errors
    }

    fn finalize(
        &self,
        entrypoint: &str,
        mut templates: Vec<Template>,
    ) -> Result<WorkflowSpec, WorkflowError> {
        let exit_handler_name = if self.exit_groups.is_empty() {
            None
        } else {
            self.ensure_unregistered(EXIT_HANDLER_TEMPLATE_NAME)?;
            templates.push(Template::steps(
                EXIT_HANDLER_TEMPLATE_NAME,
                self.exit_groups.iter().cloned().collect(),
            ));
            Some(EXIT_HANDLER_TEMPLATE_NAME.to_string())
        };

        validate_step_references(&templates)?;

        if let Some(default_retry) = &self.options.default_retry {
            for template in templates.iter_mut() {
                if template.retry_strategy().is_none() {
                    template.set_retry_strategy(default_retry.clone());
                }
            }
        }

        Ok(WorkflowSpec::new(
            self.metadata.clone(),
            entrypoint.to_string(),
            templates,
            self.main_groups.clone(),
            exit_handler_name,
            self.options.clone(),
            self.metrics.clone(),
        ))
    }

    fn push_exit_step(&mut self, step: Step) {
        if is_cleanup_priority(step.name()) {
            debug!(step = step.name(), "Prepending cleanup exit step");
            self.exit_groups.push_front(ParallelStepGroup::single(step));
        } else {
            debug!(step = step.name(), "Appending exit step");
            self.exit_groups.push_back(ParallelStepGroup::single(step));
        }
    }

    fn register_all(&mut self, templates: Vec<Template>) {
        for template in templates {
            self.registry.insert(template);
        }
    }

    fn record_error(&mut self, error: WorkflowError) -> &mut Self {
        warn!(error = %error, "Recording composition error");
        self.errors.push(error);
        self
    }

    fn first_error(&self) -> Result<(), WorkflowError> {
        match self.errors.first() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn ensure_unregistered(&self, reserved: &str) -> Result<(), WorkflowError> {
        if self.registry.contains(reserved) {
            return Err(WorkflowError::validation(format!(
                "Template name '{}' is reserved for a generated template",
                reserved
            )));
        }
        Ok(())
    }
}

/// Every step must reference a template present in the final list
fn validate_step_references(templates: &[Template]) -> Result<(), WorkflowError> {
    let names: HashSet<&str> = templates.iter().map(Template::name).collect();

    for template in templates {
        let Some(groups) = template.step_groups() else {
            continue;
        };

        for step in groups.iter().flat_map(ParallelStepGroup::steps) {
            if !names.contains(step.template()) {
                return Err(WorkflowError::validation(format!(
                    "Step '{}' in template '{}' references unknown template '{}'",
                    step.name(),
                    template.name(),
                    step.template()
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{
        ContainerSpec, ContainerStep, MetricKind, ParallelContainers, PrometheusMetric,
        RetryPolicy,
    };

    /// Component with fixed output, optionally failing one producer
    struct FixedComponent {
        steps: Result<Vec<Step>, WorkflowError>,
        templates: Result<Vec<Template>, WorkflowError>,
    }

    impl FixedComponent {
        fn step(name: &str) -> Self {
            Self::steps(&[name])
        }

        fn steps(names: &[&str]) -> Self {
            let steps = names
                .iter()
                .map(|name| Step::new(*name, format!("{}-template", name)))
                .collect();
            let templates = names
                .iter()
                .map(|name| {
                    Template::container(format!("{}-template", name), ContainerSpec::new("alpine"))
                })
                .collect();
            Self {
                steps: Ok(steps),
                templates: Ok(templates),
            }
        }
    }

    impl Component for FixedComponent {
        fn steps(&self) -> Result<Vec<Step>, WorkflowError> {
            self.steps.clone()
        }

        fn templates(&self) -> Result<Vec<Template>, WorkflowError> {
            self.templates.clone()
        }
    }

    struct FailingMetrics;

    impl MetricsProvider for FailingMetrics {
        fn metrics(&self) -> Result<WorkflowMetrics, WorkflowError> {
            Err(WorkflowError::composition("metrics unavailable"))
        }
    }

    fn step_names(groups: &[ParallelStepGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.steps().iter().map(Step::name).collect())
            .collect()
    }

    #[test]
    fn test_cleanup_priority_detection() {
        assert!(is_cleanup_priority("cleanup-db"));
        assert!(is_cleanup_priority("destroy-cluster"));
        assert!(is_cleanup_priority("pre-cleanup"));
        assert!(!is_cleanup_priority("Cleanup"));
        assert!(!is_cleanup_priority("notify"));
    }

    #[test]
    fn test_sequential_composition() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&FixedComponent::step("a"))
            .add(&FixedComponent::step("b"));

        let spec = builder.build().unwrap();

        assert_eq!(step_names(spec.main_groups()), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_multi_step_component_yields_one_group_per_step() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&FixedComponent::steps(&["fetch", "compile", "package"]))
            .add(&FixedComponent::step("publish"));

        let spec = builder.build().unwrap();

        assert_eq!(
            step_names(spec.main_groups()),
            vec![
                vec!["fetch"],
                vec!["compile"],
                vec!["package"],
                vec!["publish"]
            ]
        );
        assert!(spec.template("compile-template").is_some());
    }

    #[test]
    fn test_parallel_composition() {
        let component = ParallelContainers::new(vec![
            ContainerStep::new("lint", ContainerSpec::new("rust")),
            ContainerStep::new("test", ContainerSpec::new("rust")),
        ]);

        let mut builder = WorkflowBuilder::new("ci-");
        builder.add_parallel(&component);

        let spec = builder.build().unwrap();

        assert_eq!(step_names(spec.main_groups()), vec![vec!["lint", "test"]]);
        assert!(spec.template("lint-template").is_some());
        assert!(spec.template("test-template").is_some());
    }

    #[test]
    fn test_cleanup_priority_ordering() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&FixedComponent::step("work"))
            .add_exit_handler(&FixedComponent::step("notify"))
            .add_exit_handler(&FixedComponent::step("cleanup-db"))
            .add_exit_handler(&FixedComponent::step("cleanup-cache"));

        let spec = builder.build().unwrap();

        assert_eq!(
            step_names(spec.exit_groups()),
            vec![vec!["cleanup-cache"], vec!["cleanup-db"], vec!["notify"]]
        );
    }

    #[test]
    fn test_non_priority_exit_steps_keep_call_order() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add_exit_handler(&FixedComponent::step("notify"))
            .add_exit_handler(&FixedComponent::step("destroy-env"))
            .add_exit_handler(&FixedComponent::step("report"));

        let names: Vec<_> = builder
            .exit_groups()
            .map(|g| g.steps()[0].name())
            .collect();

        assert_eq!(names, vec!["destroy-env", "notify", "report"]);
    }

    #[test]
    fn test_mixed_exit_steps_from_one_component_ordered_per_step() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder.add_exit_handler(&FixedComponent::steps(&[
            "notify",
            "cleanup-a",
            "report",
            "destroy-b",
        ]));

        let spec = builder.build().unwrap();

        assert_eq!(
            step_names(spec.exit_groups()),
            vec![
                vec!["destroy-b"],
                vec!["cleanup-a"],
                vec!["notify"],
                vec!["report"]
            ]
        );
    }

    #[test]
    fn test_first_write_wins_and_idempotent_build() {
        let first = Template::container("shared", ContainerSpec::new("alpine:3.19"));
        let second = Template::container("shared", ContainerSpec::new("alpine:3.20"));

        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add_raw_template(first.clone())
            .add_raw_template(second);

        let spec1 = builder.build().unwrap();
        let spec2 = builder.build().unwrap();

        assert_eq!(spec1.template("shared"), Some(&first));
        assert_eq!(spec1.templates(), spec2.templates());
        assert_eq!(builder.registry().len(), 1);
    }

    #[test]
    fn test_repeated_build_does_not_accumulate_generated_templates() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&FixedComponent::step("build"))
            .add_exit_handler(&FixedComponent::step("cleanup"));

        builder.build().unwrap();
        let spec = builder.build().unwrap();

        let mains = spec.templates().iter().filter(|t| t.name() == "main").count();
        let exits = spec
            .templates()
            .iter()
            .filter(|t| t.name() == "exit-handler")
            .count();
        assert_eq!((mains, exits), (1, 1));
        assert_eq!(builder.registry().len(), 2);
    }

    #[test]
    fn test_dangling_entrypoint_rejected() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder.add(&FixedComponent::step("build"));

        let result = builder.build_with_entrypoint("missing");

        assert_eq!(
            result.unwrap_err(),
            WorkflowError::entrypoint_not_found("missing")
        );
    }

    #[test]
    fn test_build_with_entrypoint() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&FixedComponent::step("build"))
            .add_raw_template(Template::steps(
                "pipeline",
                vec![ParallelStepGroup::single(Step::new("build", "build-template"))],
            ))
            .add_exit_handler(&FixedComponent::step("cleanup"));

        let spec = builder.build_with_entrypoint("pipeline").unwrap();

        assert_eq!(spec.entrypoint(), "pipeline");
        assert!(spec.template("main").is_none());
        assert_eq!(spec.exit_handler_name(), Some("exit-handler"));
        // registry stays untouched between calls
        assert!(!builder.registry().contains("exit-handler"));
        assert_eq!(
            builder.build_with_entrypoint("pipeline").unwrap().templates(),
            spec.templates()
        );
    }

    #[test]
    fn test_exit_handler_presence() {
        let mut without = WorkflowBuilder::new("ci-");
        without.add(&FixedComponent::step("build"));
        let spec = without.build().unwrap();
        assert!(spec.template("exit-handler").is_none());
        assert!(spec.exit_handler_name().is_none());
        assert!(spec.exit_groups().is_empty());

        let mut with = WorkflowBuilder::new("ci-");
        with.add(&FixedComponent::step("build"))
            .add_exit_handler(&FixedComponent::step("notify"));
        let spec = with.build().unwrap();
        assert!(spec.template("exit-handler").is_some());
        assert_eq!(spec.exit_handler_name(), Some("exit-handler"));
    }

    #[test]
    fn test_default_retry_does_not_override() {
        let own = RetryStrategy::with_limit(5).with_policy(RetryPolicy::Always);
        let default = RetryStrategy::with_limit(2);

        let mut builder = WorkflowBuilder::new("ci-").with_default_retry(default.clone());
        builder
            .add_raw_template(
                Template::container("flaky", ContainerSpec::new("alpine"))
                    .with_retry_strategy(own.clone()),
            )
            .add(&FixedComponent::step("build"));

        let spec = builder.build().unwrap();

        assert_eq!(spec.template("flaky").unwrap().retry_strategy(), Some(&own));
        assert_eq!(
            spec.template("build-template").unwrap().retry_strategy(),
            Some(&default)
        );
        assert_eq!(spec.template("main").unwrap().retry_strategy(), Some(&default));
        // the registry keeps the undecorated template
        assert!(builder
            .registry()
            .get("build-template")
            .unwrap()
            .retry_strategy()
            .is_none());
    }

    #[test]
    fn test_steps_failure_discards_component() {
        let failing = FixedComponent {
            steps: Err(WorkflowError::composition("steps failed")),
            templates: Ok(vec![Template::container("x", ContainerSpec::new("alpine"))]),
        };

        let mut builder = WorkflowBuilder::new("ci-");
        builder.add(&failing);

        assert!(builder.registry().is_empty());
        assert!(builder.main_groups().is_empty());
        assert_eq!(
            builder.build().unwrap_err(),
            WorkflowError::composition("steps failed")
        );
    }

    #[test]
    fn test_templates_failure_discards_steps() {
        let failing = FixedComponent {
            steps: Ok(vec![Step::new("x", "x-template")]),
            templates: Err(WorkflowError::composition("templates failed")),
        };

        let mut builder = WorkflowBuilder::new("ci-");
        builder.add_exit_handler(&failing);

        assert_eq!(builder.exit_groups().count(), 0);
        assert!(builder.build_with_entrypoint("x").is_err());
    }

    #[test]
    fn test_first_composition_error_wins() {
        let first = FixedComponent {
            steps: Err(WorkflowError::composition("first")),
            templates: Ok(vec![]),
        };
        let second = FixedComponent {
            steps: Err(WorkflowError::composition("second")),
            templates: Ok(vec![]),
        };

        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&first)
            .add(&FixedComponent::step("ok"))
            .add(&second)
            .with_metrics(&FailingMetrics);

        assert_eq!(builder.errors().len(), 3);
        assert_eq!(builder.build().unwrap_err(), WorkflowError::composition("first"));
    }

    #[test]
    fn test_metrics_attached() {
        let metrics = WorkflowMetrics::new(vec![PrometheusMetric::new(
            "runs_total",
            "Number of runs",
            MetricKind::Counter {
                value: "1".to_string(),
            },
        )]);

        let mut builder = WorkflowBuilder::new("ci-");
        builder.add(&FixedComponent::step("build")).with_metrics(&metrics);

        assert_eq!(builder.build().unwrap().metrics(), Some(&metrics));
    }

    #[test]
    fn test_metrics_failure_fails_build() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder.with_metrics(&FailingMetrics);

        assert!(matches!(
            builder.build(),
            Err(WorkflowError::Composition(_))
        ));
    }

    #[test]
    fn test_unknown_template_reference_rejected() {
        let dangling = FixedComponent {
            steps: Ok(vec![Step::new("orphan", "nowhere")]),
            templates: Ok(vec![]),
        };

        let mut builder = WorkflowBuilder::new("ci-");
        builder.add(&dangling);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_reserved_main_name_rejected() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder.add_raw_template(Template::container("main", ContainerSpec::new("alpine")));

        assert!(matches!(builder.build(), Err(WorkflowError::Validation(_))));
        assert!(builder.build_with_entrypoint("main").is_ok());
    }

    #[test]
    fn test_metadata_carried_to_spec() {
        let mut builder = WorkflowBuilder::new("release-")
            .with_namespace("ci")
            .with_label("team", "platform")
            .with_service_account("runner")
            .with_parallelism(4)
            .with_archive_logs(true)
            .with_ttl_seconds(3600)
            .with_active_deadline_seconds(1800);
        builder.add(&FixedComponent::step("build"));

        let spec = builder.build().unwrap();

        assert_eq!(spec.generate_name(), "release-");
        assert_eq!(spec.namespace(), "ci");
        assert_eq!(spec.labels().get("team").map(String::as_str), Some("platform"));
        assert_eq!(spec.options().service_account_name.as_deref(), Some("runner"));
        assert_eq!(spec.options().parallelism, Some(4));
        assert!(spec.options().archive_logs);
        assert_eq!(spec.options().ttl_seconds_after_finished, Some(3600));
        assert_eq!(spec.options().active_deadline_seconds, Some(1800));
    }

    #[test]
    fn test_end_to_end_pipeline() {
        // cleanup reuses the build image's template
        let cleanup = FixedComponent {
            steps: Ok(vec![Step::new("cleanup", "build-template")]),
            templates: Ok(vec![Template::container(
                "build-template",
                ContainerSpec::new("rust"),
            )]),
        };

        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&ContainerStep::new("build", ContainerSpec::new("rust").with_command(["make"])))
            .add(&ContainerStep::new(
                "test",
                ContainerSpec::new("rust").with_command(["make", "test"]),
            ))
            .add_exit_handler(&cleanup);

        let spec = builder.build().unwrap();

        let names: Vec<_> = spec.templates().iter().map(Template::name).collect();
        assert_eq!(names, vec!["build-template", "test-template", "main", "exit-handler"]);
        assert_eq!(spec.entrypoint(), "main");
        assert_eq!(spec.exit_handler_name(), Some("exit-handler"));
        assert_eq!(spec.main_groups().len(), 2);
        assert_eq!(spec.exit_groups().len(), 1);
    }

    #[test]
    fn test_exit_component_templates_registered() {
        let mut builder = WorkflowBuilder::new("ci-");
        builder
            .add(&ContainerStep::new("build", ContainerSpec::new("rust")))
            .add_exit_handler(&ContainerStep::new("cleanup", ContainerSpec::new("alpine")));

        let spec = builder.build().unwrap();

        let names: Vec<_> = spec.templates().iter().map(Template::name).collect();
        assert_eq!(names, vec!["build-template", "cleanup-template", "main", "exit-handler"]);
    }
}
