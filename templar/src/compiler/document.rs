//! Builders for the settings and mappings sections of a template.

use crate::version::{Capabilities, MappingRoot};
use serde_json::{json, Map, Value};

pub const SETTINGS_KEY: &str = "settings";
pub const MAPPINGS_KEY: &str = "mappings";
pub const ALIASES_KEY: &str = "aliases";
pub const ORDER_KEY: &str = "order";
pub const PRIORITY_KEY: &str = "priority";
pub const COMPOSED_OF_KEY: &str = "composed_of";
pub const DATA_STREAM_KEY: &str = "data_stream";
pub const INDEX_PATTERNS_KEY: &str = "index_patterns";
pub const TEMPLATE_KEY: &str = "template";

const DEFAULT_DATE_DETECTION: bool = false;
const DEFAULT_TOTAL_FIELDS_LIMIT: u64 = 10000;
const DEFAULT_NUMBER_OF_ROUTING_SHARDS: u64 = 30;
const DEFAULT_REFRESH_INTERVAL: &str = "5s";
const DEFAULT_IGNORE_ABOVE: i64 = 1024;

/// Field-derived part of the mappings.
pub struct MappingBody {
    pub properties: Map<String, Value>,
    pub dynamic_templates: Vec<Value>,
}

/// The catch-all rule mapping unknown strings to keywords.
pub fn strings_as_keyword(caps: &Capabilities) -> Value {
    let mapping = if caps.legacy_string_syntax {
        json!({
            "ignore_above": DEFAULT_IGNORE_ABOVE,
            "index": "not_analyzed",
            "type": "string",
        })
    } else {
        json!({
            "ignore_above": DEFAULT_IGNORE_ABOVE,
            "type": "keyword",
        })
    };

    json!({
        "strings_as_keyword": {
            "mapping": mapping,
            "match_mapping_type": "string",
        }
    })
}

/// Build the `mappings` section, wrapped in the version's type root.
pub fn build_mappings(
    product_name: &str,
    product_version: &str,
    caps: &Capabilities,
    body: Option<MappingBody>,
    source: Option<&Map<String, Value>>,
) -> Value {
    let mut mapping = Map::new();
    mapping.insert(
        "_meta".to_string(),
        json!({ "version": product_version, "beat": product_name }),
    );
    mapping.insert("date_detection".to_string(), json!(DEFAULT_DATE_DETECTION));

    if let Some(body) = body {
        mapping.insert(
            "dynamic_templates".to_string(),
            Value::Array(body.dynamic_templates),
        );
        mapping.insert("properties".to_string(), Value::Object(body.properties));
    }

    if let Some(source) = source.filter(|s| !s.is_empty()) {
        mapping.insert("_source".to_string(), Value::Object(source.clone()));
    }

    if let MappingRoot::Default {
        disable_all_norms: true,
    } = caps.mapping_root
    {
        put_path(&mut mapping, "_all.norms.enabled", json!(false));
    }

    match caps.mapping_root.key() {
        Some(root) => {
            let mut wrapped = Map::new();
            wrapped.insert(root.to_string(), Value::Object(mapping));
            Value::Object(wrapped)
        }
        None => Value::Object(mapping),
    }
}

/// Build `settings.index` from defaults merged with user overrides.
pub fn build_index_settings(
    caps: &Capabilities,
    default_fields: &[String],
    user: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert(
        "refresh_interval".to_string(),
        json!(DEFAULT_REFRESH_INTERVAL),
    );
    put_path(
        &mut settings,
        "mapping.total_fields.limit",
        json!(DEFAULT_TOTAL_FIELDS_LIMIT),
    );

    if caps.routing_shards {
        settings.insert(
            "number_of_routing_shards".to_string(),
            json!(DEFAULT_NUMBER_OF_ROUTING_SHARDS),
        );
    }

    if caps.default_field {
        let mut fields: Vec<Value> = default_fields.iter().map(|f| json!(f)).collect();
        fields.push(json!("fields.*"));
        put_path(&mut settings, "query.default_field", Value::Array(fields));
    }

    if let Some(user) = user {
        deep_update(&mut settings, user);
    }
    settings
}

/// Merge `source` into `target`. Nested objects merge key by key;
/// any other value in `source` replaces the one in `target`.
pub fn deep_update(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_update(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Insert `value` at a dotted path, creating intermediate objects.
pub fn put_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut current = map;
    for part in parts {
        current = object_entry(current, part);
    }
    current.insert(last.to_string(), value);
}

/// Get the object stored under `key`, replacing any non-object value.
pub(crate) fn object_entry<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
) -> &'m mut Map<String, Value> {
    let value = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(object) => object,
        _ => unreachable!("value was just made an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ClusterVersion;

    fn caps(v: &str) -> Capabilities {
        Capabilities::resolve(&v.parse::<ClusterVersion>().unwrap())
    }

    #[test]
    fn test_deep_update_merges_nested_maps() {
        let mut target = json!({
            "refresh_interval": "5s",
            "mapping": { "total_fields": { "limit": 10000 } },
        })
        .as_object()
        .cloned()
        .unwrap();
        let user = json!({
            "refresh_interval": "30s",
            "mapping": { "total_fields": { "ignore_dynamic_beyond_limit": true } },
            "number_of_shards": 1,
        });

        deep_update(&mut target, user.as_object().unwrap());

        assert_eq!(target["refresh_interval"], "30s");
        assert_eq!(target["mapping"]["total_fields"]["limit"], 10000);
        assert_eq!(
            target["mapping"]["total_fields"]["ignore_dynamic_beyond_limit"],
            true
        );
        assert_eq!(target["number_of_shards"], 1);
    }

    #[test]
    fn test_deep_update_scalar_replaces_map() {
        let mut target = json!({ "mapping": { "a": 1 } }).as_object().cloned().unwrap();
        deep_update(&mut target, json!({ "mapping": 5 }).as_object().unwrap());
        assert_eq!(target["mapping"], 5);
    }

    #[test]
    fn test_put_path() {
        let mut map = Map::new();
        put_path(&mut map, "a.b.c", json!(1));
        put_path(&mut map, "a.b.d", json!(2));
        put_path(&mut map, "x", json!("y"));
        assert_eq!(Value::Object(map), json!({ "a": { "b": { "c": 1, "d": 2 } }, "x": "y" }));
    }

    #[test]
    fn test_index_settings_defaults() {
        let settings = build_index_settings(&caps("7.10.0"), &["message".into()], None);
        assert_eq!(settings["refresh_interval"], "5s");
        assert_eq!(settings["mapping"]["total_fields"]["limit"], 10000);
        assert_eq!(
            settings["query"]["default_field"],
            json!(["message", "fields.*"])
        );
        assert!(settings.get("number_of_routing_shards").is_none());

        let settings = build_index_settings(&caps("6.5.0"), &["message".into()], None);
        assert_eq!(settings["number_of_routing_shards"], 30);
        assert!(settings.get("query").is_none());
    }

    #[test]
    fn test_catch_all_rule_by_version() {
        let rule = strings_as_keyword(&caps("7.0.0"));
        assert_eq!(rule["strings_as_keyword"]["mapping"]["type"], "keyword");
        assert_eq!(rule["strings_as_keyword"]["mapping"]["ignore_above"], 1024);
        assert_eq!(rule["strings_as_keyword"]["match_mapping_type"], "string");

        let rule = strings_as_keyword(&caps("2.4.0"));
        assert_eq!(rule["strings_as_keyword"]["mapping"]["type"], "string");
        assert_eq!(rule["strings_as_keyword"]["mapping"]["index"], "not_analyzed");
    }

    #[test]
    fn test_mapping_roots() {
        let mapping = build_mappings("fb", "1.0.0", &caps("7.0.0"), None, None);
        assert_eq!(mapping["_meta"]["beat"], "fb");
        assert_eq!(mapping["date_detection"], false);

        let mapping = build_mappings("fb", "1.0.0", &caps("6.0.0"), None, None);
        assert_eq!(mapping["doc"]["_meta"]["version"], "1.0.0");

        let mapping = build_mappings("fb", "1.0.0", &caps("5.6.0"), None, None);
        assert!(mapping["_default_"]["_all"].is_null());

        let mapping = build_mappings("fb", "1.0.0", &caps("2.4.0"), None, None);
        assert_eq!(mapping["_default_"]["_all"]["norms"]["enabled"], false);
    }
}
