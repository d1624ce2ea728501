use anyhow::{Context, Result};
use std::sync::Arc;
use templar::{
    AppConfig, ClusterVersion, DirectoryWriter, FileClient, FileLoader, LoadOutcome, Loader,
    StdoutWriter, TemplateBuilder,
};

/// Render the configured template for `es_version` without a cluster.
pub async fn run_render(
    config: &AppConfig,
    es_version: Option<ClusterVersion>,
    stdout: bool,
    migration: bool,
) -> Result<()> {
    // 0.0.0 makes the compiler fall back to the product version
    let version = es_version
        .or_else(|| config.cluster.version.clone())
        .unwrap_or_default();

    let client: Arc<dyn FileClient> = if stdout {
        Arc::new(StdoutWriter::new(version))
    } else {
        tracing::info!("Rendering into {}", config.output.dir.display());
        Arc::new(DirectoryWriter::new(&config.output.dir, version))
    };
    let loader =
        FileLoader::new(client).with_builder(TemplateBuilder::new(config.base_dir.clone()));

    let outcome = loader
        .load(&config.template, &config.product, None, migration)
        .await
        .context("Failed to render template")?;

    if !stdout {
        if let LoadOutcome::Loaded { name } = &outcome {
            println!(
                "Wrote {}",
                config
                    .output
                    .dir
                    .join("template")
                    .join(format!("{}.json", name))
                    .display()
            );
            return Ok(());
        }
        super::report(&outcome);
    }
    Ok(())
}
