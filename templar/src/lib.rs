//! templar: compile field definitions into search-cluster schema templates
//! and install them idempotently.
//!
//! Supported template kinds:
//! - legacy (`/_template`)
//! - component (`/_component_template`, cluster 7.8+)
//! - index (`/_index_template`, cluster 7.8+)

pub mod client;
pub mod compiler;
pub mod config;
pub mod error;
pub mod fields;
pub mod format;
pub mod loader;
pub mod normalize;
pub mod version;

pub use client::{DirectoryWriter, HttpClient, StdoutWriter};
pub use compiler::{Document, Template};
pub use config::{AppConfig, Kind, ProductInfo, TemplateConfig};
pub use error::{CompileError, Error, InstallError, Result, TransportError};
pub use fields::{FieldDefinition, FieldType, Fields};
pub use loader::{
    CompiledTemplate, EsClient, EsLoader, FileClient, FileLoader, LoadOutcome, Loader, Response,
    TemplateBuilder,
};
pub use normalize::normalize;
pub use version::{Capabilities, ClusterVersion};
