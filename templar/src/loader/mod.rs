//! Template loaders
//!
//! A loader turns a [`TemplateConfig`] into a document and delivers it:
//! [`EsLoader`] installs it on a cluster, [`FileLoader`] writes it out
//! for offline use. Both share the [`TemplateBuilder`].

mod builder;
mod es;
mod file;

pub use builder::{CompiledTemplate, TemplateBuilder};
pub use es::{EsClient, EsLoader, Response};
pub use file::{FileClient, FileLoader};

use crate::config::{ProductInfo, TemplateConfig};
use crate::Result;
use async_trait::async_trait;

/// What a load call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Template generation is disabled in the config.
    Disabled,
    /// The template exists and overwrite is off.
    Skipped { name: String },
    /// The document was delivered.
    Loaded { name: String },
}

#[async_trait]
pub trait Loader: Send + Sync {
    /// Whether the target accepts data streams.
    async fn supports_data_stream(&self) -> bool;

    /// Whether the target accepts index and component templates.
    fn supports_index_templates(&self) -> bool;

    /// Build the template described by `config` and deliver it.
    ///
    /// `fields` is the built-in fields.yml content, if any.
    async fn load(
        &self,
        config: &TemplateConfig,
        product: &ProductInfo,
        fields: Option<&[u8]>,
        migration: bool,
    ) -> Result<LoadOutcome>;
}
