//! Template compiler
//!
//! A [`Template`] is created per install attempt from the template config,
//! the product info and the cluster version. It resolves its name and
//! pattern once, then turns field definitions into a complete document.

pub mod document;
pub mod processor;

pub use document::deep_update;
pub use processor::{Accumulator, Processor, MAX_FIELD_DEPTH};

use crate::config::{ProductInfo, TemplateConfig};
use crate::error::CompileError;
use crate::fields::Fields;
use crate::format::{render, EventContext};
use crate::version::{Capabilities, ClusterVersion, PatternKey};
use document::{
    build_index_settings, build_mappings, strings_as_keyword, MappingBody, COMPOSED_OF_KEY,
    DATA_STREAM_KEY, MAPPINGS_KEY, ORDER_KEY, PRIORITY_KEY, SETTINGS_KEY,
};
use serde_json::{json, Map, Value};
use std::path::Path;

/// A JSON document under construction.
pub type Document = Map<String, Value>;

/// Resolved template ready to compile field definitions.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    pattern: String,
    product_name: String,
    product_version: ClusterVersion,
    cluster_version: ClusterVersion,
    caps: Capabilities,
    config: TemplateConfig,
    migration: bool,
}

impl Template {
    /// Resolve name, pattern and composed_of for the given product.
    ///
    /// An invalid (`0.0.0`) cluster version is replaced by the product version.
    pub fn new(
        product: &ProductInfo,
        cluster_version: ClusterVersion,
        config: &TemplateConfig,
        migration: bool,
    ) -> Result<Self, CompileError> {
        let product_version: ClusterVersion = product.version.parse()?;
        let product_name = product.index_prefix().to_string();

        let name = config
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{}-{}", product_name, product_version));
        let pattern = config
            .pattern
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("{}-*", name));

        let ctx = EventContext::for_product(&product_name, &product_version.to_string());
        let name = render(&name, &ctx)?;
        let pattern = render(&pattern, &ctx)?;

        let mut config = config.clone();
        config.composed_of = config
            .composed_of
            .iter()
            .map(|c| render(c, &ctx))
            .collect::<Result<_, _>>()?;

        let cluster_version = if cluster_version.is_valid() {
            cluster_version
        } else {
            product_version.clone()
        };

        Ok(Self {
            name,
            pattern,
            product_name,
            caps: Capabilities::resolve(&cluster_version),
            product_version,
            cluster_version,
            config,
            migration,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn cluster_version(&self) -> &ClusterVersion {
        &self.cluster_version
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Compile a fields.yml file.
    pub fn load_file(&self, path: &Path) -> Result<Document, CompileError> {
        let fields = Fields::from_file(path)?;
        self.compile(fields)
    }

    /// Compile fields.yml content.
    pub fn load_bytes(&self, data: &[u8]) -> Result<Document, CompileError> {
        let fields = Fields::from_yaml(data)?;
        self.compile(fields)
    }

    /// Document with only config-derived settings and mappings.
    pub fn load_minimal(&self) -> Document {
        let mut doc = self.base_settings();
        if let Some(index) = &self.config.settings.index {
            doc.insert(SETTINGS_KEY.to_string(), json!({ "index": index }));
        }
        if let Some(source) = &self.config.settings.source {
            doc.insert(
                MAPPINGS_KEY.to_string(),
                build_mappings(
                    &self.product_name,
                    &self.product_version.to_string(),
                    &self.caps,
                    None,
                    Some(source),
                ),
            );
        }
        doc
    }

    /// Compile parsed field definitions. Each call uses its own accumulator.
    pub fn compile(&self, fields: Fields) -> Result<Document, CompileError> {
        let fields = if self.config.append_fields.is_empty() {
            fields
        } else {
            fields.concat(&self.config.append_fields)?
        };

        let mut properties = Map::new();
        let mut acc = Accumulator::default();
        Processor::new(&self.caps, self.migration).process(&fields.0, &mut properties, &mut acc)?;

        tracing::debug!(
            template = %self.name,
            properties = properties.len(),
            dynamic_templates = acc.dynamic_templates.len(),
            "Compiled field definitions"
        );
        Ok(self.generate(properties, acc))
    }

    /// Assemble the full document from compiled properties.
    pub fn generate(&self, properties: Map<String, Value>, acc: Accumulator) -> Document {
        let Accumulator {
            mut dynamic_templates,
            default_fields,
        } = acc;
        dynamic_templates.push(strings_as_keyword(&self.caps));

        let mut doc = self.base_settings();
        doc.insert(
            MAPPINGS_KEY.to_string(),
            build_mappings(
                &self.product_name,
                &self.product_version.to_string(),
                &self.caps,
                Some(MappingBody {
                    properties,
                    dynamic_templates,
                }),
                self.config.settings.source.as_ref(),
            ),
        );
        doc.insert(
            SETTINGS_KEY.to_string(),
            json!({
                "index": build_index_settings(
                    &self.caps,
                    &default_fields,
                    self.config.settings.index.as_ref(),
                )
            }),
        );
        doc
    }

    fn base_settings(&self) -> Document {
        let mut doc = Map::new();
        let patterns = match self.caps.pattern_key {
            PatternKey::Template => json!(self.pattern),
            PatternKey::IndexPatterns => json!([self.pattern]),
        };
        doc.insert(self.caps.pattern_key.key().to_string(), patterns);
        doc.insert(ORDER_KEY.to_string(), json!(self.config.order));
        doc.insert(PRIORITY_KEY.to_string(), json!(self.config.priority));
        if !self.config.composed_of.is_empty() {
            doc.insert(COMPOSED_OF_KEY.to_string(), json!(self.config.composed_of));
        }
        if let Some(data_stream) = &self.config.data_stream {
            doc.insert(DATA_STREAM_KEY.to_string(), json!(data_stream));
        }
        doc
    }
}
