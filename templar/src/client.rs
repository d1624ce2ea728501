//! Concrete transports for the loaders.

use crate::config::ClusterConfig;
use crate::error::{Error, Result, TransportError};
use crate::loader::{EsClient, FileClient, Response};
use crate::version::ClusterVersion;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

#[derive(Deserialize)]
struct RootResponse {
    version: RootVersion,
}

#[derive(Deserialize)]
struct RootVersion {
    number: String,
}

/// HTTP client for a single cluster.
pub struct HttpClient {
    client: Client,
    base: String,
    auth: Auth,
    version: ClusterVersion,
}

impl HttpClient {
    /// Build a client and discover the cluster version.
    ///
    /// A configured version skips discovery.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TransportError::from)?;

        let base = config.url.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(TransportError::from)?;

        let auth = match (&config.api_key, &config.username) {
            (Some(key), _) => Auth::ApiKey(key.clone()),
            (None, Some(username)) => Auth::Basic {
                username: username.clone(),
                password: config.password.clone().unwrap_or_default(),
            },
            (None, None) => Auth::None,
        };

        let mut http = Self {
            client,
            base,
            auth,
            version: config.version.clone().unwrap_or_default(),
        };
        if !http.version.is_valid() {
            http.version = http.discover_version().await?;
        }
        tracing::info!("Connected to {} (version {})", http.base, http.version);
        Ok(http)
    }

    async fn discover_version(&self) -> Result<ClusterVersion> {
        let response = self
            .request(Method::GET, "/", "", &HashMap::new(), None)
            .await?;
        if response.status >= 300 {
            return Err(TransportError::Other(format!(
                "version discovery failed ({}): {}",
                response.status,
                response.body_text()
            ))
            .into());
        }
        let root: RootResponse = serde_json::from_slice(&response.body)
            .map_err(|e| TransportError::Other(format!("invalid root response: {}", e)))?;
        Ok(root.version.number.parse()?)
    }
}

#[async_trait]
impl EsClient for HttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        pipeline: &str,
        params: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> std::result::Result<Response, TransportError> {
        let mut url = Url::parse(&format!("{}{}", self.base, path))?;
        {
            let mut query = url.query_pairs_mut();
            let mut sorted: Vec<_> = params.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                query.append_pair(key, value);
            }
            if !pipeline.is_empty() {
                query.append_pair("pipeline", pipeline);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let mut request = self.client.request(method, url);
        request = match &self.auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::ApiKey(key) => request.header("Authorization", format!("ApiKey {}", key)),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(Response { status, body })
    }

    fn version(&self) -> ClusterVersion {
        self.version.clone()
    }
}

/// Writes rendered documents to `<dir>/<component>/<name>.json`.
pub struct DirectoryWriter {
    dir: PathBuf,
    version: ClusterVersion,
}

impl DirectoryWriter {
    pub fn new(dir: impl Into<PathBuf>, version: ClusterVersion) -> Self {
        Self {
            dir: dir.into(),
            version,
        }
    }
}

#[async_trait]
impl FileClient for DirectoryWriter {
    fn version(&self) -> ClusterVersion {
        self.version.clone()
    }

    async fn write(&self, component: &str, name: &str, body: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::Write {
                name: name.to_string(),
                reason: "invalid file name".to_string(),
            });
        }
        let dir = self.dir.join(component);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.json", name));
        tokio::fs::write(&path, body).await?;
        tracing::debug!("Wrote {} to {}", component, path.display());
        Ok(())
    }
}

/// Prints rendered documents to stdout.
pub struct StdoutWriter {
    version: ClusterVersion,
}

impl StdoutWriter {
    pub fn new(version: ClusterVersion) -> Self {
        Self { version }
    }
}

#[async_trait]
impl FileClient for StdoutWriter {
    fn version(&self) -> ClusterVersion {
        self.version.clone()
    }

    async fn write(&self, _component: &str, _name: &str, body: &str) -> Result<()> {
        print!("{}", body);
        Ok(())
    }
}
