use super::{LoadOutcome, Loader, TemplateBuilder};
use crate::config::{ProductInfo, TemplateConfig};
use crate::error::{Error, Result};
use crate::version::{ClusterVersion, MIN_VERSION_INDEX_TEMPLATE};
use async_trait::async_trait;
use std::sync::Arc;

/// Minimal sink for rendering templates offline.
#[async_trait]
pub trait FileClient: Send + Sync {
    fn version(&self) -> ClusterVersion;

    async fn write(&self, component: &str, name: &str, body: &str) -> Result<()>;
}

/// Renders templates through a [`FileClient`] instead of a cluster.
pub struct FileLoader {
    client: Arc<dyn FileClient>,
    builder: TemplateBuilder,
}

impl FileLoader {
    pub fn new(client: Arc<dyn FileClient>) -> Self {
        Self {
            client,
            builder: TemplateBuilder::default(),
        }
    }

    pub fn with_builder(mut self, builder: TemplateBuilder) -> Self {
        self.builder = builder;
        self
    }
}

#[async_trait]
impl Loader for FileLoader {
    /// Offline targets cannot be probed; the index-template threshold decides.
    async fn supports_data_stream(&self) -> bool {
        self.client.version() >= MIN_VERSION_INDEX_TEMPLATE
    }

    fn supports_index_templates(&self) -> bool {
        self.client.version() >= MIN_VERSION_INDEX_TEMPLATE
    }

    async fn load(
        &self,
        config: &TemplateConfig,
        product: &ProductInfo,
        fields: Option<&[u8]>,
        migration: bool,
    ) -> Result<LoadOutcome> {
        let version = self.client.version();
        let Some(template) = self.builder.template(config, product, &version, migration)? else {
            return Ok(LoadOutcome::Disabled);
        };
        let name = self.builder.target_name(&template, config);
        let body = self.builder.build_body(&template, config, fields)?;

        let rendered = serde_json::to_string_pretty(&body).map_err(|e| Error::Write {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.client
            .write("template", &name, &format!("{}\n", rendered))
            .await?;
        tracing::info!("{} template '{}' written", config.kind, name);
        Ok(LoadOutcome::Loaded { name })
    }
}
