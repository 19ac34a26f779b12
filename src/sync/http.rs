//! HTTP viewer endpoint
//!
//! `GET {viewer}/state` returns the viewer's scene document and
//! `POST {viewer}/state` replaces it. Needs the `http` feature; without it
//! every call fails with `SceneError::Sync`.

use serde_json::Value;

use super::ViewerEndpoint;
use crate::config::{SceneConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{Result, SceneError};

/// Blocking client for a locally running viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpViewerEndpoint {
    url: String,
    timeout_ms: u64,
}

impl HttpViewerEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.viewer_url.as_str()).with_timeout_ms(config.timeout_ms)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn state_url(&self) -> String {
        format!("{}/state", self.url)
    }
}

#[cfg(feature = "http")]
impl HttpViewerEndpoint {
    fn client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| SceneError::sync(e.to_string()))
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response> {
        let response = request.send().map_err(|e| {
            if e.is_connect() {
                SceneError::sync(format!("no viewer running at {}: {}", self.url, e))
            } else {
                SceneError::sync(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(SceneError::sync(format!(
                "viewer at {} returned {}",
                self.url,
                response.status()
            )));
        }
        Ok(response)
    }
}

#[cfg(feature = "http")]
impl ViewerEndpoint for HttpViewerEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    fn get_state(&self) -> Result<Value> {
        let client = self.client()?;
        self.send(client.get(self.state_url()))?
            .json::<Value>()
            .map_err(|e| SceneError::sync(format!("invalid state from {}: {}", self.url, e)))
    }

    fn set_state(&self, document: &Value) -> Result<()> {
        let client = self.client()?;
        self.send(client.post(self.state_url()).json(document))?;
        Ok(())
    }
}

#[cfg(not(feature = "http"))]
impl ViewerEndpoint for HttpViewerEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    fn get_state(&self) -> Result<Value> {
        Err(not_compiled(&self.state_url()))
    }

    fn set_state(&self, _document: &Value) -> Result<()> {
        Err(not_compiled(&self.state_url()))
    }
}

#[cfg(not(feature = "http"))]
fn not_compiled(url: &str) -> SceneError {
    SceneError::sync(format!(
        "cannot reach {}: HTTP support not compiled. Build with --features http",
        url
    ))
}
