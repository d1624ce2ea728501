use crate::compiler::{Document, Template};
use crate::config::{Kind, ProductInfo, TemplateConfig};
use crate::error::{CompileError, Error, Result};
use crate::normalize::normalize;
use crate::version::ClusterVersion;
use std::path::{Path, PathBuf};

/// A compiled, normalized document with its install target.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub name: String,
    pub kind: Kind,
    pub body: Document,
}

/// Chooses the body source and applies the kind-specific shape.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    /// Base for relative `fields` and `json.path` entries.
    base_dir: PathBuf,
}

impl TemplateBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Create the template, or `None` if generation is disabled.
    pub fn template(
        &self,
        config: &TemplateConfig,
        product: &ProductInfo,
        cluster_version: &ClusterVersion,
        migration: bool,
    ) -> Result<Option<Template>> {
        if !config.enabled {
            tracing::info!("Template config not enabled");
            return Ok(None);
        }
        let template = Template::new(product, cluster_version.clone(), config, migration)?;
        Ok(Some(template))
    }

    /// Name the document is installed under.
    pub fn target_name(&self, template: &Template, config: &TemplateConfig) -> String {
        if config.json.enabled {
            match config.json.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => return name.to_string(),
                None => tracing::warn!(
                    "JSON template has no name, using '{}'",
                    template.name()
                ),
            }
        }
        template.name().to_string()
    }

    /// Build the normalized body for `config.kind`.
    pub fn build_body(
        &self,
        template: &Template,
        config: &TemplateConfig,
        fields: Option<&[u8]>,
    ) -> Result<Document> {
        if config.overwrite {
            tracing::info!("Existing template will be overwritten, as overwrite is enabled.");
        }

        let body = if config.json.enabled {
            self.body_from_json(config)?
        } else if let Some(path) = &config.fields {
            let path = self.resolve(path);
            tracing::debug!("Load fields.yml from file: {}", path.display());
            template.load_file(&path)?
        } else if let Some(fields) = fields {
            tracing::debug!("Load default fields");
            template.load_bytes(fields)?
        } else {
            tracing::debug!("Load minimal template");
            template.load_minimal()
        };

        Ok(normalize(body, config.kind))
    }

    fn body_from_json(&self, config: &TemplateConfig) -> Result<Document> {
        let path = config
            .json
            .path
            .as_deref()
            .map(|p| self.resolve(p))
            .ok_or_else(|| {
                Error::Config("template.json.enabled is set but json.path is not".into())
            })?;
        tracing::debug!("Loading json template from file {}", path.display());

        let invalid = |reason: String| CompileError::JsonOverride {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read(&path).map_err(|e| invalid(e.to_string()))?;
        let body: Document =
            serde_json::from_slice(&content).map_err(|e| invalid(e.to_string()))?;
        Ok(body)
    }

    /// Compile `config` into a document ready to install.
    ///
    /// Returns [`Error::Disabled`] when template generation is switched off.
    pub fn compile(
        &self,
        config: &TemplateConfig,
        product: &ProductInfo,
        cluster_version: &ClusterVersion,
        fields: Option<&[u8]>,
        migration: bool,
    ) -> Result<CompiledTemplate> {
        let template = self
            .template(config, product, cluster_version, migration)?
            .ok_or(Error::Disabled)?;
        let body = self.build_body(&template, config, fields)?;
        Ok(CompiledTemplate {
            name: self.target_name(&template, config),
            kind: config.kind,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    const FIELDS: &[u8] = b"- key: a\n  fields:\n    - name: message\n      type: text\n";

    fn product() -> ProductInfo {
        ProductInfo::new("testbeat", "7.10.0")
    }

    fn v7() -> ClusterVersion {
        ClusterVersion::new(7, 10, 0)
    }

    #[test]
    fn test_disabled() {
        let config = TemplateConfig {
            enabled: false,
            ..Default::default()
        };
        let builder = TemplateBuilder::default();
        assert!(builder.template(&config, &product(), &v7(), false).unwrap().is_none());

        let err = builder
            .compile(&config, &product(), &v7(), Some(FIELDS), false)
            .unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_fields_bytes_and_minimal() {
        let builder = TemplateBuilder::default();
        let compiled = builder
            .compile(&TemplateConfig::default(), &product(), &v7(), Some(FIELDS), false)
            .unwrap();
        assert_eq!(compiled.name, "testbeat-7.10.0");
        assert_eq!(compiled.kind, Kind::Legacy);
        assert_eq!(compiled.body["mappings"]["properties"]["message"]["type"], "text");
        assert!(compiled.body.get("priority").is_none());

        let compiled = builder
            .compile(&TemplateConfig::default(), &product(), &v7(), None, false)
            .unwrap();
        assert!(compiled.body.get("mappings").is_none());
    }

    #[test]
    fn test_fields_file_wins_over_bytes() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("custom.yml"),
            "- key: c\n  fields:\n    - name: custom\n      type: long\n",
        )
        .unwrap();

        let config = TemplateConfig {
            fields: Some(PathBuf::from("custom.yml")),
            ..Default::default()
        };
        let compiled = TemplateBuilder::new(temp.path())
            .compile(&config, &product(), &v7(), Some(FIELDS), false)
            .unwrap();
        let properties = &compiled.body["mappings"]["properties"];
        assert_eq!(properties["custom"]["type"], "long");
        assert!(properties.get("message").is_none());
    }

    #[test]
    fn test_json_override_is_used_verbatim_then_normalized() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("template.json");
        fs::write(
            &path,
            json!({
                "index_patterns": ["custom-*"],
                "order": 3,
                "settings": { "number_of_shards": 1 },
                "mappings": { "properties": { "a": { "type": "keyword" } } }
            })
            .to_string(),
        )
        .unwrap();

        let config: TemplateConfig = serde_json::from_value(json!({
            "kind": "index",
            "json": { "enabled": true, "path": path, "name": "custom-json" }
        }))
        .unwrap();
        let compiled = TemplateBuilder::default()
            .compile(&config, &product(), &v7(), Some(FIELDS), false)
            .unwrap();

        assert_eq!(compiled.name, "custom-json");
        assert!(compiled.body.get("order").is_none());
        assert_eq!(compiled.body["template"]["settings"]["number_of_shards"], 1);
        assert_eq!(
            compiled.body["template"]["mappings"]["properties"]["a"]["type"],
            "keyword"
        );
    }

    #[test]
    fn test_malformed_json_override() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("bad.json"), "{ not json").unwrap();
        let config: TemplateConfig = serde_json::from_value(json!({
            "json": { "enabled": true, "path": "bad.json", "name": "x" }
        }))
        .unwrap();
        let err = TemplateBuilder::new(temp.path())
            .compile(&config, &product(), &v7(), None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(CompileError::JsonOverride { .. })
        ));

        let config: TemplateConfig = serde_json::from_value(json!({
            "json": { "enabled": true, "path": "missing.json" }
        }))
        .unwrap();
        assert!(TemplateBuilder::new(temp.path())
            .compile(&config, &product(), &v7(), None, false)
            .is_err());
    }

    #[test]
    fn test_json_override_without_path_is_config_error() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "json": { "enabled": true, "name": "x" }
        }))
        .unwrap();
        let err = TemplateBuilder::default()
            .compile(&config, &product(), &v7(), Some(FIELDS), false)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_skip());
    }

    #[test]
    fn test_bad_fields_source_is_compile_error() {
        let err = TemplateBuilder::default()
            .compile(
                &TemplateConfig::default(),
                &product(),
                &v7(),
                Some(b"- key: [broken".as_slice()),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::FieldSource(_))));
    }
}
