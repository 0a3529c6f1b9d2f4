//! Submit command - composes a pipeline file and submits it

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use tokio::signal;
use tracing::info;

use super::pipeline::PipelineFile;
use super::CliContext;
use crate::infrastructure::backend::manifest::render_manifest;

/// Arguments for the submit command
#[derive(Args, Clone)]
pub struct SubmitArgs {
    /// Pipeline description (JSON)
    pub file: PathBuf,

    /// Wait for the workflow to finish
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait before giving up (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Run the submit command
pub async fn run(context: &CliContext, args: SubmitArgs) -> anyhow::Result<()> {
    let spec = PipelineFile::load(&args.file)?.build(&context.namespace)?;
    let client = context.client();

    if !args.wait {
        let created = client.submit(&spec).await?;
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }

    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| context.config.lifecycle.wait_timeout());
    info!(timeout_secs = timeout.as_secs(), "Submitting and waiting");

    match client
        .submit_and_wait_until(&spec, timeout, interrupted())
        .await
    {
        Ok(finished) => {
            println!("{}", serde_json::to_string_pretty(&finished)?);
            Ok(())
        }
        Err(e) => {
            if let Some(workflow) = e.workflow() {
                println!("{}", serde_json::to_string_pretty(workflow)?);
            }
            Err(e.into())
        }
    }
}

/// Print the manifest without submitting
pub fn render(context: &CliContext, file: &Path) -> anyhow::Result<()> {
    let spec = PipelineFile::load(file)?.build(&context.namespace)?;
    let manifest = render_manifest(&spec, spec.namespace())?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

/// Completes on Ctrl+C; never completes if the handler cannot be installed
async fn interrupted() {
    if signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
