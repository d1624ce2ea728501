//! Scripted cluster client shared by the integration tests.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use templar::{ClusterVersion, EsClient, Response, TransportError};

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

pub struct MockClient {
    version: ClusterVersion,
    routes: Mutex<HashMap<(Method, String), Result<Response, String>>>,
    calls: Mutex<Vec<Call>>,
    probe_count: AtomicUsize,
    probe_delay: Duration,
}

impl MockClient {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.parse().unwrap(),
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            probe_count: AtomicUsize::new(0),
            probe_delay: Duration::ZERO,
        }
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn respond(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Ok(Response {
                status,
                body: body.as_bytes().to_vec(),
            }),
        );
        self
    }

    pub fn fail(self, method: Method, path: &str, reason: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Err(reason.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == Method::PUT)
            .collect()
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EsClient for MockClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        _pipeline: &str,
        params: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push(Call {
            method: method.clone(),
            path: path.to_string(),
            params: params.clone(),
            body: body.cloned(),
        });

        if path == "/_xpack" {
            self.probe_count.fetch_add(1, Ordering::SeqCst);
            if !self.probe_delay.is_zero() {
                tokio::time::sleep(self.probe_delay).await;
            }
        }

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(method.clone(), path.to_string()))
            .cloned();
        match route {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(TransportError::Other(reason)),
            None if method == Method::PUT => Ok(Response {
                status: 200,
                body: b"{\"acknowledged\":true}".to_vec(),
            }),
            None => Ok(Response {
                status: 404,
                body: b"{}".to_vec(),
            }),
        }
    }

    fn version(&self) -> ClusterVersion {
        self.version.clone()
    }
}
