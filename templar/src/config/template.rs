//! Template section of the configuration.

use crate::fields::FieldDefinition;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Generation of the schema-template API to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kind {
    /// `/_template`
    #[default]
    Legacy,
    /// `/_component_template`
    Component,
    /// `/_index_template`
    Index,
}

impl Kind {
    /// Resource path prefix for this kind, ending in a slash.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Kind::Legacy => "/_template/",
            Kind::Component => "/_component_template/",
            Kind::Index => "/_index_template/",
        }
    }

    /// Resource path of a named template.
    pub fn resource_path(&self, name: &str) -> String {
        format!("{}{}", self.path_prefix(), name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Legacy => "legacy",
            Kind::Component => "component",
            Kind::Index => "index",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown input falls back to [`Kind::Legacy`] instead of failing.
impl FromStr for Kind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Kind::Legacy,
            "component" => Kind::Component,
            "index" => Kind::Index,
            other => {
                tracing::warn!("Unknown template kind '{}', falling back to legacy", other);
                Kind::Legacy
            }
        })
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_default())
    }
}

/// Configuration for generating and installing a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Template name; defaults to `{index_prefix}-{version}`.
    #[serde(default)]
    pub name: Option<String>,

    /// Index pattern; defaults to `{name}-*`.
    #[serde(default)]
    pub pattern: Option<String>,

    /// External fields.yml to compile instead of the built-in fields.
    #[serde(default)]
    pub fields: Option<PathBuf>,

    #[serde(default)]
    pub json: JsonTemplateConfig,

    /// Extra fields appended after the loaded ones.
    #[serde(default)]
    pub append_fields: Vec<FieldDefinition>,

    #[serde(default)]
    pub overwrite: bool,

    #[serde(default)]
    pub settings: TemplateSettings,

    #[serde(default = "default_order")]
    pub order: i64,

    #[serde(default = "default_priority")]
    pub priority: i64,

    #[serde(default)]
    pub kind: Kind,

    /// Component templates an index template is composed of.
    #[serde(default)]
    pub composed_of: Vec<String>,

    /// Data stream marker, e.g. `{ "hidden": "false" }`.
    #[serde(default)]
    pub data_stream: Option<BTreeMap<String, String>>,
}

fn default_true() -> bool {
    true
}

fn default_order() -> i64 {
    1
}

fn default_priority() -> i64 {
    150
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            pattern: None,
            fields: None,
            json: JsonTemplateConfig::default(),
            append_fields: Vec::new(),
            overwrite: false,
            settings: TemplateSettings::default(),
            order: default_order(),
            priority: default_priority(),
            kind: Kind::Legacy,
            composed_of: Vec::new(),
            data_stream: None,
        }
    }
}

/// Use a complete JSON document as the template body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTemplateConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Name under which the JSON document is installed.
    #[serde(default)]
    pub name: Option<String>,
}

/// Index and `_source` overrides merged into the generated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(default)]
    pub index: Option<Map<String, Value>>,
    #[serde(default, rename = "_source")]
    pub source: Option<Map<String, Value>>,
}
