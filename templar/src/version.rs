//! Cluster version handling and the capability policy derived from it.
//!
//! Every version-conditional branch of the compiler and the loader goes
//! through [`Capabilities`], so the thresholds live in one place.

use crate::error::CompileError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// First version with composable index and component templates.
pub const MIN_VERSION_INDEX_TEMPLATE: ClusterVersion = ClusterVersion::new(7, 8, 0);

/// First version where data streams may be probed for.
pub const MIN_VERSION_DATA_STREAM: ClusterVersion = ClusterVersion::new(7, 9, 0);

const MIN_VERSION_ROUTING_SHARDS: ClusterVersion = ClusterVersion::new(6, 1, 0);
const MIN_VERSION_ALIAS: ClusterVersion = ClusterVersion::new(6, 4, 0);
const MIN_VERSION_WILDCARD: ClusterVersion = ClusterVersion::new(7, 9, 0);
const MIN_VERSION_MATCH_ONLY_TEXT: ClusterVersion = ClusterVersion::new(7, 14, 0);

/// A `major.minor.patch` version with an optional pre-release suffix.
///
/// Ordering and equality only look at the numeric triple.
#[derive(Debug, Clone, Default)]
pub struct ClusterVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub meta: Option<String>,
}

impl ClusterVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            meta: None,
        }
    }

    /// `0.0.0` is the "unknown" marker and is not valid.
    pub fn is_valid(&self) -> bool {
        self.major != 0 || self.minor != 0 || self.patch != 0
    }

    fn triple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for ClusterVersion {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for ClusterVersion {}

impl PartialOrd for ClusterVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClusterVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl FromStr for ClusterVersion {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CompileError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let (numbers, meta) = match trimmed.split_once('-') {
            Some((numbers, meta)) => (numbers, Some(meta.to_string())),
            None => (trimmed, None),
        };

        let mut parts = numbers.split('.');
        let mut next = |required: bool| -> Result<u32, CompileError> {
            match parts.next() {
                Some(p) => p.parse::<u32>().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
            meta,
        })
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(meta) = &self.meta {
            write!(f, "-{}", meta)?;
        }
        Ok(())
    }
}

impl Serialize for ClusterVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClusterVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Root under which the mapping body is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingRoot {
    /// `_default_` type root (also disables `_all` norms on 2.x).
    Default { disable_all_norms: bool },
    /// Single `doc` type root.
    Doc,
    /// No type root.
    Typeless,
}

impl MappingRoot {
    pub fn key(&self) -> Option<&'static str> {
        match self {
            MappingRoot::Default { .. } => Some("_default_"),
            MappingRoot::Doc => Some("doc"),
            MappingRoot::Typeless => None,
        }
    }
}

/// Key that holds the index pattern of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKey {
    /// `template: "<pattern>"`
    Template,
    /// `index_patterns: ["<pattern>"]`
    IndexPatterns,
}

impl PatternKey {
    pub fn key(&self) -> &'static str {
        match self {
            PatternKey::Template => "template",
            PatternKey::IndexPatterns => "index_patterns",
        }
    }
}

/// Everything the compiler needs to know about a cluster version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub index_templates: bool,
    /// Version allows data streams; the loader still has to probe.
    pub data_stream_version: bool,
    pub mapping_root: MappingRoot,
    pub pattern_key: PatternKey,
    pub routing_shards: bool,
    pub default_field: bool,
    pub field_aliases: bool,
    pub wildcard_type: bool,
    pub match_only_text_type: bool,
    /// 2.x `string`/`not_analyzed` mapping syntax.
    pub legacy_string_syntax: bool,
    pub include_type_name: bool,
}

impl Capabilities {
    pub fn resolve(version: &ClusterVersion) -> Self {
        let major = version.major;
        let mapping_root = match major {
            2 => MappingRoot::Default {
                disable_all_norms: true,
            },
            m if m < 6 => MappingRoot::Default {
                disable_all_norms: false,
            },
            6 => MappingRoot::Doc,
            _ => MappingRoot::Typeless,
        };

        Self {
            index_templates: *version >= MIN_VERSION_INDEX_TEMPLATE,
            data_stream_version: *version >= MIN_VERSION_DATA_STREAM,
            mapping_root,
            pattern_key: if major < 6 {
                PatternKey::Template
            } else {
                PatternKey::IndexPatterns
            },
            routing_shards: *version >= MIN_VERSION_ROUTING_SHARDS && major < 7,
            default_field: major >= 7,
            field_aliases: *version >= MIN_VERSION_ALIAS,
            wildcard_type: *version >= MIN_VERSION_WILDCARD,
            match_only_text_type: *version >= MIN_VERSION_MATCH_ONLY_TEXT,
            legacy_string_syntax: major == 2,
            include_type_name: major == 6 && version.minor == 7,
        }
    }

    /// Query parameters attached to every template write request.
    pub fn request_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if self.include_type_name {
            params.insert("include_type_name".to_string(), "true".to_string());
        }
        params
    }
}
