use crate::config::Kind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Template generation is switched off in the config. Not a failure:
    /// callers treat it as "nothing to install".
    #[error("Template generation is disabled")]
    Disabled,

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Could not load {kind} template '{name}': {source}")]
    Install {
        kind: Kind,
        name: String,
        #[source]
        source: InstallError,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Write error for '{name}': {reason}")]
    Write { name: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for outcomes that mean "skip", not "fail".
    pub fn is_skip(&self) -> bool {
        matches!(self, Error::Disabled)
    }
}

/// Failures while turning field definitions and config into a document.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Failed to parse field definitions: {0}")]
    FieldSource(String),

    #[error("Failed to read field definitions from {path}: {reason}")]
    FieldFile { path: String, reason: String },

    #[error("Field '{0}' is defined more than once")]
    DuplicateField(String),

    #[error("Field '{path}' exceeds the maximum nesting depth of {limit}")]
    FieldDepth { path: String, limit: usize },

    #[error("Alias field '{0}' has no target path")]
    AliasWithoutPath(String),

    #[error("Failed to render '{input}': {reason}")]
    Format { input: String, reason: String },

    #[error("Invalid JSON template {path}: {reason}")]
    JsonOverride { path: String, reason: String },
}

/// Failures of the network round trip that installs a template.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("rejected by server (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Client-level failure reaching the cluster.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
