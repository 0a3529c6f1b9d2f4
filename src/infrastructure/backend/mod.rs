//! Workflow backend implementations

mod factory;
mod http;
mod in_memory;
pub mod manifest;

pub use factory::{create_backend, BackendType};
pub use http::{validate_resource_name, HttpBackendConfig, HttpWorkflowBackend};
pub use in_memory::InMemoryWorkflowBackend;
