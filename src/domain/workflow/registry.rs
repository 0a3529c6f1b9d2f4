//! Name-keyed template registry

use std::collections::HashSet;

use tracing::debug;

use super::template::Template;

/// Templates registered for one specification build, in registration order.
///
/// Registration is first-write-wins: inserting a template whose name is
/// already present is silently ignored, even when its body differs from the
/// stored one.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
    seen: HashSet<String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Returns `false` when the name was already taken.
    pub fn insert(&mut self, template: Template) -> bool {
        if self.seen.contains(template.name()) {
            debug!(template = template.name(), "Template already registered, keeping first");
            return false;
        }

        self.seen.insert(template.name().to_string());
        self.templates.push(template);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::ContainerSpec;

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = TemplateRegistry::new();

        assert!(registry.insert(Template::container("a", ContainerSpec::new("alpine"))));
        assert!(registry.insert(Template::container("b", ContainerSpec::new("busybox"))));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
        assert_eq!(registry.templates()[1].name(), "b");
    }

    #[test]
    fn test_first_write_wins() {
        let mut registry = TemplateRegistry::new();
        let first = Template::container("shared", ContainerSpec::new("alpine:3.19"));
        let second = Template::container("shared", ContainerSpec::new("alpine:3.20"));

        assert!(registry.insert(first.clone()));
        assert!(!registry.insert(second));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("shared"), Some(&first));
    }
}
