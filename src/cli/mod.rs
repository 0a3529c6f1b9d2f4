//! CLI module for the workflow composer
//!
//! Provides subcommands to compose pipelines and manage submitted workflows:
//! - `submit`: compose a pipeline file and submit it, optionally waiting
//! - `render`: print the manifest a pipeline file composes to
//! - `status`, `list`, `delete`: inspect and remove submitted workflows

pub mod pipeline;
pub mod submit;
pub mod workflows;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::workflow::{WorkflowBackend, WorkflowClient};
use crate::infrastructure::{backend, logging};

/// Compose workflow specifications and drive them on a workflow server
#[derive(Parser)]
#[command(name = "workflow-composer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Namespace to use instead of the configured one
    #[arg(long, short = 'n', global = true)]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compose a pipeline file and submit it
    Submit(submit::SubmitArgs),

    /// Print the manifest a pipeline file composes to
    Render {
        /// Pipeline description (JSON)
        file: PathBuf,
    },

    /// Show the status of a workflow
    Status { name: String },

    /// List workflows
    List {
        /// Label selector, e.g. `team=platform,tier!=test`
        #[arg(long, short = 'l', default_value = "")]
        selector: String,
    },

    /// Delete a workflow
    Delete { name: String },
}

/// Shared state for every subcommand
pub struct CliContext {
    pub config: AppConfig,
    pub namespace: String,
    pub backend: Arc<dyn WorkflowBackend>,
}

impl CliContext {
    /// Load `.env` and configuration, set up logging and the backend
    pub fn init(namespace_override: Option<String>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = AppConfig::load().unwrap_or_default();
        logging::init_logging(&config.logging);

        let namespace = namespace_override.unwrap_or_else(|| config.backend.namespace.clone());
        let backend = backend::create_backend(&config.backend)?;

        Ok(Self {
            config,
            namespace,
            backend,
        })
    }

    pub fn client(&self) -> WorkflowClient {
        WorkflowClient::new(self.backend.clone())
            .with_poll_interval(self.config.lifecycle.poll_interval())
    }
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let context = CliContext::init(cli.namespace)?;

    match cli.command {
        Command::Submit(args) => submit::run(&context, args).await,
        Command::Render { file } => submit::render(&context, &file),
        Command::Status { name } => workflows::status(&context, &name).await,
        Command::List { selector } => workflows::list(&context, &selector).await,
        Command::Delete { name } => workflows::delete(&context, &name).await,
    }
}
