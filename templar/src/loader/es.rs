use super::{LoadOutcome, Loader, TemplateBuilder};
use crate::compiler::Document;
use crate::config::{Kind, ProductInfo, TemplateConfig};
use crate::error::{Error, InstallError, Result, TransportError};
use crate::version::{Capabilities, ClusterVersion, MIN_VERSION_DATA_STREAM, MIN_VERSION_INDEX_TEMPLATE};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Raw response of a cluster request.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Subset of a cluster client needed to install templates.
#[async_trait]
pub trait EsClient: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        pipeline: &str,
        params: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> std::result::Result<Response, TransportError>;

    fn version(&self) -> ClusterVersion;
}

/// Installs templates on a cluster.
pub struct EsLoader {
    client: Arc<dyn EsClient>,
    builder: TemplateBuilder,
    supports_index_templates: bool,
    data_stream: OnceCell<bool>,
}

impl EsLoader {
    pub fn new(client: Arc<dyn EsClient>) -> Self {
        let version = client.version();
        Self {
            client,
            builder: TemplateBuilder::default(),
            supports_index_templates: version >= MIN_VERSION_INDEX_TEMPLATE,
            data_stream: OnceCell::new(),
        }
    }

    /// Resolve relative template paths against `builder`'s base directory.
    pub fn with_builder(mut self, builder: TemplateBuilder) -> Self {
        self.builder = builder;
        self
    }

    async fn probe_data_stream(&self) -> bool {
        let version = self.client.version();
        if version < MIN_VERSION_DATA_STREAM {
            return false;
        }
        let supported = match self
            .client
            .request(Method::GET, "/_xpack", "", &HashMap::new(), None)
            .await
        {
            Ok(response) => response.status < 400,
            Err(e) => {
                tracing::debug!("Data stream probe failed: {}", e);
                false
            }
        };
        tracing::debug!("Data streams supported by {}: {}", version, supported);
        supported
    }

    /// Whether a template of `kind` named `name` is already installed.
    ///
    /// Legacy and component lookups also require the name in the response
    /// body; index lookups trust the status alone. Failed requests count
    /// as "does not exist".
    pub async fn exists(&self, kind: Kind, name: &str) -> bool {
        let path = kind.resource_path(name);
        let response = match self
            .client
            .request(Method::GET, &path, "", &HashMap::new(), None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Existence check for {} failed: {}", path, e);
                return false;
            }
        };

        if response.status != 200 {
            return false;
        }
        match kind {
            Kind::Index => true,
            Kind::Legacy | Kind::Component => response.body_text().contains(name),
        }
    }

    /// Install `body` unless it already exists and `overwrite` is off.
    ///
    /// Returns `true` if the document was written.
    pub async fn install(
        &self,
        kind: Kind,
        name: &str,
        body: &Document,
        overwrite: bool,
    ) -> Result<bool> {
        if !overwrite && self.exists(kind, name).await {
            tracing::info!(
                "{} template {} already exists and will not be overwritten.",
                kind,
                name
            );
            return Ok(false);
        }
        self.put(kind, name, body).await?;
        Ok(true)
    }

    async fn put(&self, kind: Kind, name: &str, body: &Document) -> Result<()> {
        tracing::info!("Try loading {} template {}", kind, name);
        let params = Capabilities::resolve(&self.client.version()).request_params();
        let body = Value::Object(body.clone());
        let wrap = |source: InstallError| Error::Install {
            kind,
            name: name.to_string(),
            source,
        };

        let response = self
            .client
            .request(Method::PUT, &kind.resource_path(name), "", &params, Some(&body))
            .await
            .map_err(|e| wrap(InstallError::Transport(e)))?;

        if response.status > 300 {
            return Err(wrap(InstallError::Rejected {
                status: response.status,
                body: response.body_text(),
            }));
        }
        tracing::info!("{} template with name '{}' loaded.", kind, name);
        Ok(())
    }
}

#[async_trait]
impl Loader for EsLoader {
    async fn supports_data_stream(&self) -> bool {
        *self
            .data_stream
            .get_or_init(|| self.probe_data_stream())
            .await
    }

    fn supports_index_templates(&self) -> bool {
        self.supports_index_templates
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

        if !config.overwrite && self.exists(config.kind, &name).await {
            tracing::info!(
                "{} template {} already exists and will not be overwritten.",
                config.kind,
                name
            );
            return Ok(LoadOutcome::Skipped { name });
        }

        let body = self.builder.build_body(&template, config, fields)?;
        self.put(config.kind, &name, &body).await?;
        Ok(LoadOutcome::Loaded { name })
    }
}
