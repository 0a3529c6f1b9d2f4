//! Backend factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::http::{HttpBackendConfig, HttpWorkflowBackend};
use super::in_memory::InMemoryWorkflowBackend;
use crate::config::BackendConfig;
use crate::domain::workflow::WorkflowBackend;
use crate::domain::DomainError;

/// Supported backend types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BackendType {
    /// Remote workflow server over HTTP
    #[default]
    Http,
    /// Process-local store, nothing is executed
    InMemory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Http => write!(f, "http"),
            BackendType::InMemory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "remote" => Ok(BackendType::Http),
            "memory" | "in_memory" | "inmemory" => Ok(BackendType::InMemory),
            _ => Err(DomainError::configuration(format!(
                "Unknown backend mode: {}. Valid modes: http, memory",
                s
            ))),
        }
    }
}

/// Create the backend selected by configuration
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn WorkflowBackend>, DomainError> {
    let backend_type: BackendType = config.mode.parse()?;
    info!(mode = %backend_type, namespace = %config.namespace, "Creating workflow backend");

    match backend_type {
        BackendType::Http => {
            let mut http_config = HttpBackendConfig::new(&config.base_url)
                .with_default_namespace(&config.namespace)
                .with_request_timeout(Duration::from_secs(config.request_timeout_secs));
            if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
                http_config = http_config.with_token(token);
            }
            Ok(Arc::new(HttpWorkflowBackend::new(http_config)?))
        }
        BackendType::InMemory => Ok(Arc::new(InMemoryWorkflowBackend::new(&config.namespace))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!("http".parse::<BackendType>().unwrap(), BackendType::Http);
        assert_eq!("Memory".parse::<BackendType>().unwrap(), BackendType::InMemory);
        assert!("grpc".parse::<BackendType>().is_err());
    }

    #[test]
    fn test_backend_type_display() {
        assert_eq!(BackendType::Http.to_string(), "http");
        assert_eq!(BackendType::InMemory.to_string(), "memory");
    }

    #[test]
    fn test_create_backend() {
        let mut config = BackendConfig::default();
        assert!(create_backend(&config).is_ok());

        config.mode = "memory".to_string();
        assert!(create_backend(&config).is_ok());

        config.mode = "carrier-pigeon".to_string();
        assert!(matches!(
            create_backend(&config),
            Err(DomainError::Configuration { .. })
        ));
    }
}
