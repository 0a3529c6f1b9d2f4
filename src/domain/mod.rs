//! Domain layer - Workflow composition, lifecycle and core errors

pub mod error;
pub mod workflow;

pub use error::DomainError;
