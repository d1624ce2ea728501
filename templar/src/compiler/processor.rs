//! Recursive walk turning field definitions into mapping properties.
//!
//! Dynamic templates and default fields discovered during the walk are
//! collected in an [`Accumulator`] owned by the caller, so concurrent
//! compiles never share state.

use super::document::{deep_update, object_entry};
use crate::error::CompileError;
use crate::fields::{FieldDefinition, FieldType};
use crate::version::Capabilities;
use serde_json::{json, Map, Value};

/// Deepest nesting accepted before the walk is aborted.
pub const MAX_FIELD_DEPTH: usize = 64;

const DEFAULT_IGNORE_ABOVE: i64 = 1024;
const DEFAULT_SCALING_FACTOR: i64 = 1000;

/// Side outputs of a single compile call.
#[derive(Debug, Default)]
pub struct Accumulator {
    pub dynamic_templates: Vec<Value>,
    pub default_fields: Vec<String>,
}

pub struct Processor<'a> {
    caps: &'a Capabilities,
    migration: bool,
}

impl<'a> Processor<'a> {
    pub fn new(caps: &'a Capabilities, migration: bool) -> Self {
        Self { caps, migration }
    }

    /// Process `fields` into `output`, a `properties` map.
    pub fn process(
        &self,
        fields: &[FieldDefinition],
        output: &mut Map<String, Value>,
        acc: &mut Accumulator,
    ) -> Result<(), CompileError> {
        self.walk(fields, None, true, 0, output, acc)
    }

    fn walk(
        &self,
        fields: &[FieldDefinition],
        parent: Option<&str>,
        inherited_default_field: bool,
        depth: usize,
        output: &mut Map<String, Value>,
        acc: &mut Accumulator,
    ) -> Result<(), CompileError> {
        for field in fields {
            if field.name.is_empty() {
                continue;
            }
            let path = match parent {
                Some(parent) => format!("{}.{}", parent, field.name),
                None => field.name.clone(),
            };
            if depth >= MAX_FIELD_DEPTH {
                return Err(CompileError::FieldDepth {
                    path,
                    limit: MAX_FIELD_DEPTH,
                });
            }
            let default_field = field.default_field.unwrap_or(inherited_default_field);

            let mapping = match &field.field_type {
                FieldType::Group | FieldType::Nested => {
                    let mut properties = Map::new();
                    self.walk(
                        &field.fields,
                        Some(path.as_str()),
                        default_field,
                        depth + 1,
                        &mut properties,
                        acc,
                    )?;
                    self.group(field, properties)
                }
                FieldType::Object => self.object(field, &path, acc),
                FieldType::Alias => self.alias(field, &path)?,
                _ => self.leaf(field),
            };

            if default_field && field.field_type.is_default_searchable() {
                acc.default_fields.push(path);
            }

            if let Some(mapping) = mapping {
                insert_field(output, &field.name, mapping);
            }
        }
        Ok(())
    }

    /// Mapping for types without children. Also used for multi_fields.
    fn leaf(&self, field: &FieldDefinition) -> Option<Map<String, Value>> {
        let mut mapping = match &field.field_type {
            FieldType::Keyword => self.keyword(field),
            FieldType::Text => self.text(field),
            FieldType::MatchOnlyText if self.caps.match_only_text_type => {
                type_only("match_only_text")
            }
            FieldType::MatchOnlyText => self.text(field),
            FieldType::Wildcard if self.caps.wildcard_type => {
                let mut m = type_only("wildcard");
                if let Some(n) = field.ignore_above.filter(|n| *n > 0) {
                    m.insert("ignore_above".to_string(), json!(n));
                }
                m
            }
            FieldType::Wildcard => self.keyword(field),
            FieldType::ScaledFloat => {
                let mut m = type_only("scaled_float");
                m.insert(
                    "scaling_factor".to_string(),
                    json!(field.scaling_factor.unwrap_or(DEFAULT_SCALING_FACTOR)),
                );
                m
            }
            FieldType::Array => return self.array(field),
            FieldType::Other(name) => type_only(name),
            FieldType::Group | FieldType::Nested | FieldType::Object | FieldType::Alias => {
                return None
            }
        };

        if let Some(index) = field.index {
            mapping.insert("index".to_string(), json!(index));
        }
        if let Some(doc_values) = field.doc_values {
            mapping.insert("doc_values".to_string(), json!(doc_values));
        }
        if let Some(copy_to) = &field.copy_to {
            mapping.insert("copy_to".to_string(), json!(copy_to));
        }
        if let Some(null_value) = &field.null_value {
            mapping.insert("null_value".to_string(), null_value.clone());
        }

        if !field.multi_fields.is_empty() {
            let mut multi = Map::new();
            for sub in &field.multi_fields {
                if let Some(sub_mapping) = self.leaf(sub) {
                    multi.insert(sub.name.clone(), Value::Object(sub_mapping));
                }
            }
            mapping.insert("fields".to_string(), Value::Object(multi));
        }

        Some(mapping)
    }

    fn keyword(&self, field: &FieldDefinition) -> Map<String, Value> {
        let mut mapping = if self.caps.legacy_string_syntax {
            let mut m = type_only("string");
            m.insert("index".to_string(), json!("not_analyzed"));
            m
        } else {
            type_only("keyword")
        };

        match field.ignore_above {
            None => {
                mapping.insert("ignore_above".to_string(), json!(DEFAULT_IGNORE_ABOVE));
            }
            Some(n) if n > 0 => {
                mapping.insert("ignore_above".to_string(), json!(n));
            }
            Some(_) => {}
        }
        mapping
    }

    fn text(&self, field: &FieldDefinition) -> Map<String, Value> {
        let mut mapping = if self.caps.legacy_string_syntax {
            let mut m = type_only("string");
            m.insert("index".to_string(), json!("analyzed"));
            m
        } else {
            type_only("text")
        };

        if !field.norms {
            let norms = if self.caps.legacy_string_syntax {
                json!({ "enabled": false })
            } else {
                json!(false)
            };
            mapping.insert("norms".to_string(), norms);
        }
        if let Some(analyzer) = &field.analyzer {
            mapping.insert("analyzer".to_string(), json!(analyzer));
        }
        if let Some(analyzer) = &field.search_analyzer {
            mapping.insert("search_analyzer".to_string(), json!(analyzer));
        }
        mapping
    }

    fn array(&self, field: &FieldDefinition) -> Option<Map<String, Value>> {
        if let Some(object_type) = &field.object_type {
            return Some(type_only(object_type));
        }
        if field.enabled == Some(false) {
            let mut mapping = type_only("object");
            mapping.insert("enabled".to_string(), json!(false));
            return Some(mapping);
        }
        None
    }

    fn alias(
        &self,
        field: &FieldDefinition,
        path: &str,
    ) -> Result<Option<Map<String, Value>>, CompileError> {
        if !self.caps.field_aliases {
            tracing::debug!("Skipping alias field '{}': not supported by cluster", path);
            return Ok(None);
        }
        if field.migration && !self.migration {
            return Ok(None);
        }
        let target = field
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CompileError::AliasWithoutPath(path.to_string()))?;

        let mut mapping = type_only("alias");
        mapping.insert("path".to_string(), json!(target));
        Ok(Some(mapping))
    }

    fn object(
        &self,
        field: &FieldDefinition,
        path: &str,
        acc: &mut Accumulator,
    ) -> Option<Map<String, Value>> {
        if let Some(object_type) = &field.object_type {
            acc.dynamic_templates
                .push(self.object_dynamic_template(field, object_type, path));
            if field.enabled.is_none() && field.dynamic.is_none() {
                return None;
            }
        }

        let mut mapping = type_only("object");
        if let Some(enabled) = field.enabled {
            mapping.insert("enabled".to_string(), json!(enabled));
        }
        if let Some(dynamic) = &field.dynamic {
            mapping.insert("dynamic".to_string(), dynamic.clone());
        }
        Some(mapping)
    }

    fn object_dynamic_template(
        &self,
        field: &FieldDefinition,
        object_type: &str,
        path: &str,
    ) -> Value {
        let (match_mapping_type, mapping) = match object_type {
            "text" => ("string", Value::Object(self.text(field))),
            "keyword" if self.caps.legacy_string_syntax => (
                "string",
                json!({ "type": "string", "index": "not_analyzed" }),
            ),
            "keyword" => ("string", json!({ "type": "keyword" })),
            "long" => ("long", json!({ "type": "long" })),
            "double" | "float" | "half_float" => ("double", json!({ "type": object_type })),
            "scaled_float" => (
                "double",
                json!({
                    "type": "scaled_float",
                    "scaling_factor": field.scaling_factor.unwrap_or(DEFAULT_SCALING_FACTOR),
                }),
            ),
            "boolean" => ("boolean", json!({ "type": "boolean" })),
            "date" => ("date", json!({ "type": "date" })),
            other => ("*", json!({ "type": other })),
        };
        let match_mapping_type = field
            .object_type_mapping_type
            .as_deref()
            .unwrap_or(match_mapping_type);

        let mut entry = Map::new();
        entry.insert(
            path.to_string(),
            json!({
                "mapping": mapping,
                "match_mapping_type": match_mapping_type,
                "path_match": format!("{}.*", path),
            }),
        );
        Value::Object(entry)
    }

    fn group(
        &self,
        field: &FieldDefinition,
        properties: Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        let nested = field.field_type == FieldType::Nested;
        if !nested && properties.is_empty() && field.enabled.is_none() && field.dynamic.is_none()
        {
            return None;
        }

        let mut mapping = Map::new();
        if nested {
            mapping.insert("type".to_string(), json!("nested"));
        }
        if let Some(enabled) = field.enabled {
            mapping.insert("enabled".to_string(), json!(enabled));
        }
        if let Some(dynamic) = &field.dynamic {
            mapping.insert("dynamic".to_string(), dynamic.clone());
        }
        mapping.insert("properties".to_string(), Value::Object(properties));
        Some(mapping)
    }
}

fn type_only(name: &str) -> Map<String, Value> {
    let mut mapping = Map::new();
    mapping.insert("type".to_string(), json!(name));
    mapping
}

/// Insert a field mapping. Dotted names expand into nested `properties`.
///
/// A name that already holds an object mapping with `properties` (a group
/// defined twice, or `a.b` followed by a group `a`) is merged key by key.
fn insert_field(output: &mut Map<String, Value>, name: &str, mapping: Map<String, Value>) {
    let mut parts: Vec<&str> = name.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut current = output;
    for part in parts {
        let node = object_entry(current, part);
        current = object_entry(node, "properties");
    }

    let merge = match current.get(last) {
        Some(Value::Object(existing)) => {
            existing.contains_key("properties") || mapping.contains_key("properties")
        }
        _ => false,
    };
    if merge {
        deep_update(object_entry(current, last), &mapping);
    } else {
        current.insert(last.to_string(), Value::Object(mapping));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Fields;
    use crate::version::ClusterVersion;

    fn run(yaml: &str, version: &str, migration: bool) -> (Value, Accumulator) {
        let fields = Fields::from_yaml(yaml.as_bytes()).unwrap();
        let caps = Capabilities::resolve(&version.parse::<ClusterVersion>().unwrap());
        let mut output = Map::new();
        let mut acc = Accumulator::default();
        Processor::new(&caps, migration)
            .process(&fields.0, &mut output, &mut acc)
            .unwrap();
        (Value::Object(output), acc)
    }

    #[test]
    fn test_keyword_and_text() {
        let (out, acc) = run(
            r#"
- key: t
  fields:
    - name: host
    - name: message
      type: text
      analyzer: simple
      multi_fields:
        - name: raw
          type: keyword
          ignore_above: 256
    - name: id
      type: keyword
      ignore_above: -1
"#,
            "7.10.0",
            false,
        );

        assert_eq!(out["host"], json!({ "type": "keyword", "ignore_above": 1024 }));
        assert_eq!(out["message"]["type"], "text");
        assert_eq!(out["message"]["norms"], false);
        assert_eq!(out["message"]["analyzer"], "simple");
        assert_eq!(
            out["message"]["fields"]["raw"],
            json!({ "type": "keyword", "ignore_above": 256 })
        );
        assert_eq!(out["id"], json!({ "type": "keyword" }));
        assert_eq!(acc.default_fields, vec!["host", "message", "id"]);
    }

    #[test]
    fn test_groups_and_default_field_inheritance() {
        let (out, acc) = run(
            r#"
- key: t
  fields:
    - name: http
      type: group
      default_field: false
      fields:
        - name: method
        - name: body
          type: group
          fields:
            - name: content
              type: text
              default_field: true
    - name: empty
      type: group
"#,
            "7.10.0",
            false,
        );

        assert_eq!(out["http"]["properties"]["method"]["type"], "keyword");
        assert_eq!(
            out["http"]["properties"]["body"]["properties"]["content"]["type"],
            "text"
        );
        assert!(out.get("empty").is_none());
        assert_eq!(acc.default_fields, vec!["http.body.content"]);
    }

    #[test]
    fn test_nested_and_dotted_names() {
        let (out, _) = run(
            r#"
- key: t
  fields:
    - name: items
      type: nested
      dynamic: strict
      fields:
        - name: sku
    - name: user.name
"#,
            "7.10.0",
            false,
        );

        assert_eq!(out["items"]["type"], "nested");
        assert_eq!(out["items"]["dynamic"], "strict");
        assert_eq!(out["items"]["properties"]["sku"]["type"], "keyword");
        assert_eq!(out["user"]["properties"]["name"]["type"], "keyword");
    }

    #[test]
    fn test_object_type_emits_dynamic_templates_in_order() {
        let (out, acc) = run(
            r#"
- key: t
  fields:
    - name: labels
      type: object
      object_type: keyword
    - name: metrics
      type: object
      object_type: scaled_float
      scaling_factor: 100
    - name: raw
      type: object
      enabled: false
"#,
            "7.10.0",
            false,
        );

        assert!(out.get("labels").is_none());
        assert_eq!(out["raw"], json!({ "type": "object", "enabled": false }));
        assert_eq!(acc.dynamic_templates.len(), 2);
        assert_eq!(
            acc.dynamic_templates[0],
            json!({ "labels": {
                "mapping": { "type": "keyword" },
                "match_mapping_type": "string",
                "path_match": "labels.*",
            }})
        );
        assert_eq!(
            acc.dynamic_templates[1]["metrics"]["mapping"]["scaling_factor"],
            100
        );
        assert_eq!(
            acc.dynamic_templates[1]["metrics"]["match_mapping_type"],
            "double"
        );
    }

    #[test]
    fn test_array_flags() {
        let (out, _) = run(
            r#"
- key: t
  fields:
    - name: tags
      type: array
    - name: ids
      type: array
      object_type: keyword
    - name: blobs
      type: array
      enabled: false
"#,
            "7.10.0",
            false,
        );
        assert!(out.get("tags").is_none());
        assert_eq!(out["ids"], json!({ "type": "keyword" }));
        assert_eq!(out["blobs"], json!({ "type": "object", "enabled": false }));
    }

    #[test]
    fn test_alias_rules() {
        let yaml = r#"
- key: t
  fields:
    - name: src
      type: alias
      path: source.ip
    - name: old
      type: alias
      path: new.field
      migration: true
"#;
        let (out, _) = run(yaml, "7.0.0", false);
        assert_eq!(out["src"], json!({ "type": "alias", "path": "source.ip" }));
        assert!(out.get("old").is_none());

        let (out, _) = run(yaml, "7.0.0", true);
        assert_eq!(out["old"]["path"], "new.field");

        let (out, _) = run(yaml, "6.3.0", true);
        assert!(out.get("src").is_none());
    }

    #[test]
    fn test_alias_without_path_fails() {
        let fields = Fields::from_yaml(b"- key: t\n  fields:\n    - name: a\n      type: alias\n")
            .unwrap();
        let caps = Capabilities::resolve(&ClusterVersion::new(7, 0, 0));
        let err = Processor::new(&caps, false)
            .process(&fields.0, &mut Map::new(), &mut Accumulator::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::AliasWithoutPath(p) if p == "a"));
    }

    #[test]
    fn test_version_dependent_types() {
        let yaml = r#"
- key: t
  fields:
    - name: body
      type: match_only_text
    - name: url
      type: wildcard
"#;
        let (out, _) = run(yaml, "7.14.0", false);
        assert_eq!(out["body"]["type"], "match_only_text");
        assert_eq!(out["url"]["type"], "wildcard");

        let (out, _) = run(yaml, "7.8.0", false);
        assert_eq!(out["body"]["type"], "text");
        assert_eq!(out["url"]["type"], "keyword");

        let (out, _) = run(yaml, "2.4.0", false);
        assert_eq!(out["body"]["type"], "string");
        assert_eq!(out["body"]["norms"], json!({ "enabled": false }));
        assert_eq!(out["url"]["index"], "not_analyzed");
    }

    #[test]
    fn test_other_types_pass_through() {
        let (out, _) = run(
            r#"
- key: t
  fields:
    - name: count
      type: long
      doc_values: false
    - name: ip
      type: ip
      index: false
      null_value: "0.0.0.0"
    - name: price
      type: scaled_float
"#,
            "7.0.0",
            false,
        );
        assert_eq!(out["count"], json!({ "type": "long", "doc_values": false }));
        assert_eq!(
            out["ip"],
            json!({ "type": "ip", "index": false, "null_value": "0.0.0.0" })
        );
        assert_eq!(out["price"]["scaling_factor"], 1000);
    }

    #[test]
    fn test_depth_limit() {
        let mut field = FieldDefinition::new("leaf", FieldType::Keyword);
        for i in 0..=MAX_FIELD_DEPTH {
            field = FieldDefinition::new(format!("g{}", i), FieldType::Group).with_fields(vec![field]);
        }
        let caps = Capabilities::resolve(&ClusterVersion::new(7, 0, 0));
        let err = Processor::new(&caps, false)
            .process(&[field], &mut Map::new(), &mut Accumulator::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::FieldDepth { limit, .. } if limit == MAX_FIELD_DEPTH));
    }

    #[test]
    fn test_repeated_groups_merge() {
        let (out, acc) = run(
            r#"
- key: first
  fields:
    - name: host
      type: group
      fields:
        - name: name
    - name: user.name
- key: second
  fields:
    - name: host
      type: group
      fields:
        - name: ip
          type: ip
    - name: user
      type: group
      fields:
        - name: id
"#,
            "7.10.0",
            false,
        );

        assert_eq!(out["host"]["properties"]["name"]["type"], "keyword");
        assert_eq!(out["host"]["properties"]["ip"]["type"], "ip");
        assert_eq!(out["user"]["properties"]["name"]["type"], "keyword");
        assert_eq!(out["user"]["properties"]["id"]["type"], "keyword");
        assert_eq!(acc.default_fields, vec!["host.name", "user.name", "user.id"]);
    }

    #[test]
    fn test_group_then_dotted_name_merge() {
        let (out, _) = run(
            r#"
- key: t
  fields:
    - name: event
      type: nested
      fields:
        - name: kind
    - name: event.code
      type: long
"#,
            "7.10.0",
            false,
        );
        assert_eq!(out["event"]["type"], "nested");
        assert_eq!(out["event"]["properties"]["kind"]["type"], "keyword");
        assert_eq!(out["event"]["properties"]["code"]["type"], "long");
    }
}
