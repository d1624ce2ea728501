//! Placeholder format strings
//!
//! Template names, patterns and `composed_of` entries may reference the
//! product that generates them:
//!
//! - `%{[agent.version]}` expands a dotted path from the event context
//! - `%{[agent.version]:fallback}` uses `fallback` when the path is missing
//! - `%{+yyyy.MM.dd}` formats the context timestamp

use crate::error::CompileError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

static FIELD_EXPANSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\](?::(.*))?$").expect("static regex is valid")
});

/// Values available to format strings.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub fields: Value,
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    /// Context exposing the product under the `beat`, `agent` and `observer` keys.
    pub fn for_product(name: &str, version: &str) -> Self {
        let product = json!({ "name": name, "version": version });
        Self {
            fields: json!({
                "beat": product.clone(),
                "agent": product.clone(),
                "observer": product,
            }),
            timestamp: Utc::now(),
        }
    }

    fn lookup(&self, path: &str) -> Option<String> {
        let mut current = &self.fields;
        for key in path.split('.') {
            current = current.get(key)?;
        }
        match current {
            Value::String(s) => Some(s.clone()),
            Value::Null | Value::Object(_) | Value::Array(_) => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field {
        path: String,
        fallback: Option<String>,
    },
    Timestamp(String),
}

/// A compiled format string.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatString {
    input: String,
    segments: Vec<Segment>,
}

impl FormatString {
    pub fn compile(input: &str) -> Result<Self, CompileError> {
        let error = |reason: &str| CompileError::Format {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = input;
        while let Some(start) = rest.find("%{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let body_start = start + 2;
            let end = rest[body_start..]
                .find('}')
                .ok_or_else(|| error("unterminated '%{' expansion"))?;
            let body = &rest[body_start..body_start + end];

            if let Some(layout) = body.strip_prefix('+') {
                if layout.is_empty() {
                    return Err(error("empty timestamp layout"));
                }
                segments.push(Segment::Timestamp(joda_to_strftime(layout)));
            } else if let Some(caps) = FIELD_EXPANSION.captures(body) {
                segments.push(Segment::Field {
                    path: caps[1].to_string(),
                    fallback: caps.get(2).map(|m| m.as_str().to_string()),
                });
            } else {
                return Err(error(&format!("unsupported expansion '%{{{}}}'", body)));
            }
            rest = &rest[body_start + end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            input: input.to_string(),
            segments,
        })
    }

    pub fn run(&self, ctx: &EventContext) -> Result<String, CompileError> {
        let mut out = String::with_capacity(self.input.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field { path, fallback } => match (ctx.lookup(path), fallback) {
                    (Some(value), _) => out.push_str(&value),
                    (None, Some(fallback)) => out.push_str(fallback),
                    (None, None) => {
                        return Err(CompileError::Format {
                            input: self.input.clone(),
                            reason: format!("key '{}' not found", path),
                        })
                    }
                },
                Segment::Timestamp(layout) => {
                    out.push_str(&ctx.timestamp.format(layout).to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Compile and run in one step.
pub fn render(input: &str, ctx: &EventContext) -> Result<String, CompileError> {
    FormatString::compile(input)?.run(ctx)
}

fn joda_to_strftime(layout: &str) -> String {
    const TOKENS: [(&str, &str); 7] = [
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::new();
    let mut rest = layout;
    'outer: while !rest.is_empty() {
        for (joda, strftime) in TOKENS {
            if let Some(tail) = rest.strip_prefix(joda) {
                out.push_str(strftime);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}
