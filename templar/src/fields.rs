//! Field definitions
//!
//! A fields.yml file is a list of top-level groups, each carrying a
//! `fields` list. The compiler only sees the concatenated field lists.
//!
//! # Example
//!
//! ```yaml
//! - key: base
//!   title: Base
//!   fields:
//!     - name: "@timestamp"
//!       type: date
//!     - name: message
//!       type: text
//!     - name: labels
//!       type: object
//!       object_type: keyword
//! ```

use crate::error::CompileError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Type tag of a field definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldType {
    /// An empty type tag is treated as keyword.
    #[default]
    Keyword,
    Text,
    MatchOnlyText,
    Wildcard,
    ScaledFloat,
    Alias,
    Object,
    Array,
    Group,
    Nested,
    /// Passed through as `{"type": <name>}`.
    Other(String),
}

impl FieldType {
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "keyword" => FieldType::Keyword,
            "text" => FieldType::Text,
            "match_only_text" => FieldType::MatchOnlyText,
            "wildcard" => FieldType::Wildcard,
            "scaled_float" => FieldType::ScaledFloat,
            "alias" => FieldType::Alias,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            "group" => FieldType::Group,
            "nested" => FieldType::Nested,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::MatchOnlyText => "match_only_text",
            FieldType::Wildcard => "wildcard",
            FieldType::ScaledFloat => "scaled_float",
            FieldType::Alias => "alias",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Group => "group",
            FieldType::Nested => "nested",
            FieldType::Other(name) => name,
        }
    }

    /// Types whose values are searched by default queries.
    pub fn is_default_searchable(&self) -> bool {
        matches!(
            self,
            FieldType::Keyword | FieldType::Text | FieldType::MatchOnlyText | FieldType::Wildcard
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FieldType::parse(&s))
    }
}

/// A single field, possibly with children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// `true`, `false` or a string mode such as `strict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_values: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_above: Option<i64>,
    #[serde(default)]
    pub norms: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_factor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_mapping_type: Option<String>,
    /// Alias target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Alias only installed when migration mode is on.
    #[serde(default)]
    pub migration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<Value>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }
}

/// Top-level entry of a fields.yml file.
#[derive(Debug, Clone, Deserialize)]
struct FieldGroup {
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

/// Ordered list of top-level field definitions.
#[derive(Debug, Clone, Default)]
pub struct Fields(pub Vec<FieldDefinition>);

impl Fields {
    /// Parse a fields.yml document.
    pub fn from_yaml(data: &[u8]) -> Result<Self, CompileError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Fields::default());
        }
        // `~` or `null` documents count as empty
        let groups: Option<Vec<FieldGroup>> = serde_yaml::from_slice(data)
            .map_err(|e| CompileError::FieldSource(e.to_string()))?;
        Ok(Fields(
            groups
                .unwrap_or_default()
                .into_iter()
                .flat_map(|g| g.fields)
                .collect(),
        ))
    }

    /// Load and parse a fields.yml file.
    pub fn from_file(path: &Path) -> Result<Self, CompileError> {
        let data = std::fs::read(path).map_err(|e| CompileError::FieldFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&data).map_err(|e| CompileError::FieldFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Append `extra` after the existing fields. Top-level names must stay unique.
    pub fn concat(mut self, extra: &[FieldDefinition]) -> Result<Self, CompileError> {
        let mut seen: HashSet<&str> = self.0.iter().map(|f| f.name.as_str()).collect();
        for field in extra {
            if !seen.insert(field.name.as_str()) {
                return Err(CompileError::DuplicateField(field.name.clone()));
            }
        }
        self.0.extend(extra.iter().cloned());
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDefinition> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS_YML: &str = r#"
- key: base
  title: Base
  fields:
    - name: "@timestamp"
      type: date
    - name: message
      type: text
- key: host
  fields:
    - name: host
      type: group
      fields:
        - name: name
        - name: ip
          type: ip
"#;

    #[test]
    fn test_groups_are_flattened_in_order() {
        let fields = Fields::from_yaml(FIELDS_YML.as_bytes()).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["@timestamp", "message", "host"]);

        let host = &fields.0[2];
        assert_eq!(host.field_type, FieldType::Group);
        assert_eq!(host.fields[0].field_type, FieldType::Keyword);
        assert_eq!(host.fields[1].field_type, FieldType::Other("ip".into()));
    }

    #[test]
    fn test_empty_input() {
        assert!(Fields::from_yaml(b"").unwrap().is_empty());
        assert!(Fields::from_yaml(b"  \n").unwrap().is_empty());
        assert!(Fields::from_yaml(b"[]").unwrap().is_empty());
        assert!(Fields::from_yaml(b"~").unwrap().is_empty());
        assert!(Fields::from_yaml(b"null\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Fields::from_yaml(b"- key: [unclosed").unwrap_err();
        assert!(matches!(err, CompileError::FieldSource(_)));

        let err = Fields::from_yaml(b"key: not-a-list").unwrap_err();
        assert!(matches!(err, CompileError::FieldSource(_)));
    }

    #[test]
    fn test_concat_rejects_duplicates() {
        let fields = Fields(vec![FieldDefinition::new("a", FieldType::Keyword)]);
        let extended = fields
            .clone()
            .concat(&[FieldDefinition::new("b", FieldType::Text)])
            .unwrap();
        assert_eq!(extended.0.len(), 2);

        let err = fields
            .concat(&[FieldDefinition::new("a", FieldType::Text)])
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateField(name) if name == "a"));
    }

    #[test]
    fn test_missing_file() {
        let err = Fields::from_file(Path::new("/nonexistent/fields.yml")).unwrap_err();
        assert!(matches!(err, CompileError::FieldFile { .. }));
    }
}
