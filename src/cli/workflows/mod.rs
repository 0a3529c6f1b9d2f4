//! Status, list and delete commands

use super::CliContext;

pub async fn status(context: &CliContext, name: &str) -> anyhow::Result<()> {
    let status = context.client().get_status(&context.namespace, name).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn list(context: &CliContext, selector: &str) -> anyhow::Result<()> {
    let workflows = context.client().list(&context.namespace, selector).await?;

    for workflow in &workflows {
        println!(
            "{:<40} {:<12} {}",
            workflow.name(),
            workflow.phase(),
            workflow
                .status()
                .started_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn delete(context: &CliContext, name: &str) -> anyhow::Result<()> {
    context.client().delete(&context.namespace, name).await?;
    println!("Deleted {}/{}", context.namespace, name);
    Ok(())
}
