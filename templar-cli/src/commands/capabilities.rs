use anyhow::Result;
use serde_json::json;
use templar::version::MappingRoot;
use templar::{AppConfig, Capabilities, ClusterVersion, EsClient, HttpClient};

/// Print the capability set for a version as JSON.
pub async fn run_capabilities(config: &AppConfig, es_version: Option<ClusterVersion>) -> Result<()> {
    let version = match es_version {
        Some(version) => version,
        None => HttpClient::connect(&config.cluster).await?.version(),
    };
    let caps = Capabilities::resolve(&version);
    println!("{}", serde_json::to_string_pretty(&describe(&version, &caps))?);
    Ok(())
}

fn describe(version: &ClusterVersion, caps: &Capabilities) -> serde_json::Value {
    let mapping_root = match caps.mapping_root {
        MappingRoot::Default { .. } => "_default_",
        MappingRoot::Doc => "doc",
        MappingRoot::Typeless => "none",
    };
    json!({
        "version": version.to_string(),
        "index_templates": caps.index_templates,
        "data_stream": caps.data_stream_version,
        "mapping_root": mapping_root,
        "pattern_key": caps.pattern_key.key(),
        "routing_shards": caps.routing_shards,
        "default_field": caps.default_field,
        "field_aliases": caps.field_aliases,
        "wildcard_type": caps.wildcard_type,
        "match_only_text_type": caps.match_only_text_type,
        "include_type_name": caps.include_type_name,
    })
}
