//! Configuration
//!
//! Where URLs are generated against and which services the HTTP clients
//! talk to. Values come from defaults, environment variables, or a JSON file.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::scene::Scene;

/// Public neuroglancer deployment used when a scene has no base URL.
pub const DEFAULT_BASE_URL: &str = "https://neuroglancer-demo.appspot.com/";

/// Default address of a locally running viewer.
pub const DEFAULT_VIEWER_URL: &str = "http://127.0.0.1:9000";

/// Default timeout for blocking HTTP calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings shared by the codec and the HTTP collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Viewer deployment that generated URLs point at
    pub base_url: String,
    /// JSON state server, if any
    pub state_server_url: Option<String>,
    /// Local viewer process endpoint
    pub viewer_url: String,
    /// Timeout for each HTTP request
    pub timeout_ms: u64,
    /// Bearer token sent to the state server
    pub auth_token: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            state_server_url: None,
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_token: None,
        }
    }
}

impl SceneConfig {
    /// Build a config from `NGSCENES_*` environment variables.
    ///
    /// Unset variables fall back to the defaults. A timeout that does not
    /// parse as milliseconds is an error rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let timeout_ms = match env::var("NGSCENES_TIMEOUT_MS") {
            Ok(raw) => raw.trim().parse().map_err(|_| SceneError::Config {
                reason: format!("NGSCENES_TIMEOUT_MS must be an integer, got '{}'", raw),
            })?,
            Err(_) => defaults.timeout_ms,
        };

        Ok(Self {
            base_url: env::var("NGSCENES_BASE_URL").unwrap_or(defaults.base_url),
            state_server_url: env::var("NGSCENES_STATE_SERVER").ok(),
            viewer_url: env::var("NGSCENES_VIEWER_URL").unwrap_or(defaults.viewer_url),
            timeout_ms,
            auth_token: env::var("NGSCENES_AUTH_TOKEN").ok(),
        })
    }

    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SceneConfig = serde_json::from_str(&content).map_err(|e| SceneError::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_state_server(mut self, url: impl Into<String>) -> Self {
        self.state_server_url = Some(url.into());
        self
    }

    pub fn with_viewer_url(mut self, url: impl Into<String>) -> Self {
        self.viewer_url = url.into();
        self
    }

    /// An empty scene whose URLs point at the configured deployment
    pub fn new_scene(&self) -> Scene {
        Scene::new().with_base_url(self.base_url.as_str())
    }
}
