//! Configuration management for templar
//!
//! Default config location: ~/.templar/config.toml

mod template;

pub use template::{JsonTemplateConfig, Kind, TemplateConfig, TemplateSettings};

use crate::version::ClusterVersion;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub product: ProductInfo,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub template: TemplateConfig,

    /// Directory relative template paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// The product a template is generated for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductInfo {
    #[serde(default = "default_product_name")]
    pub name: String,
    #[serde(default = "default_product_version")]
    pub version: String,
    /// Prefix used for derived template names; defaults to `name`.
    #[serde(default)]
    pub index_prefix: Option<String>,
}

fn default_product_name() -> String {
    "templar".to_string()
}

fn default_product_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            name: default_product_name(),
            version: default_product_version(),
            index_prefix: None,
        }
    }
}

impl ProductInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            index_prefix: None,
        }
    }

    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = Some(prefix.into());
        self
    }

    pub fn index_prefix(&self) -> &str {
        self.index_prefix.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    #[serde(default = "default_cluster_url")]
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// Skip version discovery and assume this version.
    pub version: Option<ClusterVersion>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cluster_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: default_cluster_url(),
            username: None,
            password: None,
            api_key: None,
            version: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

/// Target of offline rendering.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./rendered")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Expand tilde in path to home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Ok(rest) = path.strip_prefix("~") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}

impl AppConfig {
    /// Default config path: ~/.templar/config.toml
    pub fn default_path() -> Result<PathBuf> {
        expand_tilde(Path::new("~/.templar/config.toml"))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_or_default(&Self::default_path()?)
    }

    /// Load config from a TOML file, or defaults if the file does not exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        let config_path = expand_tilde(config_path)?;
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("Failed to parse config {}", config_path.display()))?
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            AppConfig::default()
        };

        config.base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.expand_paths()?;
        Ok(config)
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.output.dir = expand_tilde(&self.output.dir)?;
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(expand_tilde(file)?);
        }
        if let Some(fields) = &self.template.fields {
            self.template.fields = Some(expand_tilde(fields)?);
        }
        if let Some(path) = &self.template.json.path {
            self.template.json.path = Some(expand_tilde(path)?);
        }
        Ok(())
    }
}
