use anyhow::{Context, Result};
use std::sync::Arc;
use templar::{AppConfig, EsLoader, HttpClient, Loader, TemplateBuilder};

/// Install the configured template on the configured cluster.
pub async fn run_install(config: &AppConfig, migration: bool) -> Result<()> {
    let client = HttpClient::connect(&config.cluster)
        .await
        .with_context(|| format!("Failed to connect to {}", config.cluster.url))?;
    let loader = EsLoader::new(Arc::new(client))
        .with_builder(TemplateBuilder::new(config.base_dir.clone()));

    if config.template.kind != templar::Kind::Legacy && !loader.supports_index_templates() {
        tracing::warn!(
            "Cluster does not support {} templates, the request will likely be rejected",
            config.template.kind
        );
    }
    if config.template.data_stream.is_some() && !loader.supports_data_stream().await {
        tracing::warn!("Cluster does not support data streams");
    }

    let outcome = loader
        .load(&config.template, &config.product, None, migration)
        .await?;
    super::report(&outcome);
    Ok(())
}
