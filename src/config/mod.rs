mod app_config;

pub use app_config::{AppConfig, BackendConfig, LifecycleConfig, LogFormat, LoggingConfig};
