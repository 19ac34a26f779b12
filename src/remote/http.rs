//! HTTP state service
//!
//! Talks to a JSON state server:
//! - `POST {server}/state` stores a document, the response body is its handle
//! - `GET {server}/state/{handle}` fetches it
//! - `PUT {server}/state/{handle}` replaces it
//!
//! Handles that are themselves `http(s)://` URLs are fetched directly and
//! `gs://bucket/path` handles through the public storage endpoint.
//!
//! The real client needs the `http` feature; without it every call fails
//! with `RemoteService`.

use serde_json::Value;
use tracing::debug;

use super::StateService;
use crate::config::{SceneConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{Result, SceneError};

const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Blocking client for a JSON state server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStateService {
    server_url: String,
    timeout_ms: u64,
    auth_token: Option<String>,
}

impl HttpStateService {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_token: None,
        }
    }

    /// Client for the configured state server
    pub fn from_config(config: &SceneConfig) -> Result<Self> {
        let server_url = config
            .state_server_url
            .as_deref()
            .ok_or_else(|| SceneError::Config {
                reason: "no state server configured (set NGSCENES_STATE_SERVER)".to_string(),
            })?;

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Where the document for `handle` lives
    pub fn handle_url(&self, handle: &str) -> String {
        if handle.starts_with("http://") || handle.starts_with("https://") {
            handle.to_string()
        } else if let Some(path) = handle.strip_prefix("gs://") {
            format!("{}/{}", GCS_ENDPOINT, path)
        } else {
            format!("{}/state/{}", self.server_url, handle)
        }
    }
}

/// Pull the handle out of a create response: a bare or JSON-quoted string,
/// or a number.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn parse_handle(body: &str) -> Result<String> {
    let body = body.trim();
    let handle = match serde_json::from_str::<Value>(body) {
        Ok(Value::String(handle)) => handle,
        Ok(Value::Number(id)) => id.to_string(),
        _ => body.to_string(),
    };

    if handle.is_empty() {
        return Err(SceneError::remote("state server returned an empty handle"));
    }
    Ok(handle)
}

#[cfg(feature = "http")]
impl HttpStateService {
    fn client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| SceneError::remote(e.to_string()))
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::blocking::Response> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                SceneError::remote(format!("request to {} timed out after {}ms", url, self.timeout_ms))
            } else if e.is_connect() {
                SceneError::remote(format!("cannot connect to {}: {}", url, e))
            } else {
                SceneError::remote(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(SceneError::remote(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

#[cfg(feature = "http")]
impl StateService for HttpStateService {
    fn create(&self, document: &Value) -> Result<String> {
        let url = format!("{}/state", self.server_url);
        let client = self.client()?;
        let response = self.send(client.post(&url).json(document), &url)?;
        let body = response
            .text()
            .map_err(|e| SceneError::remote(format!("invalid response from {}: {}", url, e)))?;

        let handle = parse_handle(&body)?;
        debug!(handle = %handle, "Stored scene on state server");
        Ok(handle)
    }

    fn fetch(&self, handle: &str) -> Result<Value> {
        let url = self.handle_url(handle);
        let client = self.client()?;
        debug!(url = %url, "Fetching scene from state server");
        self.send(client.get(&url), &url)?
            .json::<Value>()
            .map_err(|e| SceneError::remote(format!("invalid JSON from {}: {}", url, e)))
    }

    fn update(&self, handle: &str, document: &Value) -> Result<()> {
        let url = self.handle_url(handle);
        let client = self.client()?;
        self.send(client.put(&url).json(document), &url)?;
        debug!(handle = %handle, "Updated scene on state server");
        Ok(())
    }
}

#[cfg(not(feature = "http"))]
impl StateService for HttpStateService {
    fn create(&self, _document: &Value) -> Result<String> {
        Err(not_compiled())
    }

    fn fetch(&self, handle: &str) -> Result<Value> {
        debug!(url = %self.handle_url(handle), "HTTP support not compiled");
        Err(not_compiled())
    }

    fn update(&self, _handle: &str, _document: &Value) -> Result<()> {
        Err(not_compiled())
    }
}

#[cfg(not(feature = "http"))]
fn not_compiled() -> SceneError {
    SceneError::remote("HTTP support not compiled. Build with --features http")
}
