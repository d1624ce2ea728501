//! Document shape per template kind.
//!
//! - legacy: drop the composable-only keys
//! - index: drop `order`, nest the body under `template`
//! - component: drop `order` and the pattern, nest, then apply legacy removal

use crate::compiler::document::{
    ALIASES_KEY, COMPOSED_OF_KEY, DATA_STREAM_KEY, INDEX_PATTERNS_KEY, MAPPINGS_KEY, ORDER_KEY,
    PRIORITY_KEY, SETTINGS_KEY, TEMPLATE_KEY,
};
use crate::compiler::Document;
use crate::config::Kind;
use serde_json::{Map, Value};

/// Adapt a compiled document to the wire shape of `kind`.
pub fn normalize(body: Document, kind: Kind) -> Document {
    match kind {
        Kind::Legacy => normalize_legacy(body),
        Kind::Component => normalize_component(body),
        Kind::Index => normalize_index(body),
    }
}

pub fn normalize_legacy(mut body: Document) -> Document {
    for key in [PRIORITY_KEY, COMPOSED_OF_KEY, DATA_STREAM_KEY] {
        body.remove(key);
    }
    body
}

pub fn normalize_component(mut body: Document) -> Document {
    body.remove(ORDER_KEY);
    body.remove(INDEX_PATTERNS_KEY);
    // pre-6.x pattern string shares the `template` key
    if body.get(TEMPLATE_KEY).is_some_and(Value::is_string) {
        body.remove(TEMPLATE_KEY);
    }
    normalize_legacy(nest_under_template(body))
}

pub fn normalize_index(mut body: Document) -> Document {
    body.remove(ORDER_KEY);
    nest_under_template(body)
}

/// Move `settings`, `mappings` and `aliases` into a single `template` object.
///
/// A non-object `template` value is a pre-6.x pattern, which index
/// templates cannot carry. It is dropped.
fn nest_under_template(mut body: Document) -> Document {
    let mut nested = match body.remove(TEMPLATE_KEY) {
        Some(Value::Object(existing)) => existing,
        Some(pattern) => {
            tracing::warn!(
                "Dropping pre-6.x pattern {} from index template; the cluster version does not support index templates",
                pattern
            );
            Map::new()
        }
        None => Map::new(),
    };

    for key in [SETTINGS_KEY, MAPPINGS_KEY, ALIASES_KEY] {
        if let Some(value) = body.remove(key) {
            nested.insert(key.to_string(), value);
        }
    }

    if !nested.is_empty() {
        body.insert(TEMPLATE_KEY.to_string(), Value::Object(nested));
    }
    body
}
