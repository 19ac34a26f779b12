//! Scene Codec Module
//!
//! Converts scenes to and from their wire forms:
//! - JSON documents (`json`)
//! - viewer URLs with an embedded fragment or a state handle (`url`)
//!
//! `decode` accepts any of these and figures out which one it was given.

pub mod json;
pub mod url;

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use self::url::ViewerUrl;
use crate::config::DEFAULT_BASE_URL;
use crate::error::{Result, SceneError};
use crate::remote::StateService;
use crate::scene::Scene;

pub use json::fingerprint;

/// Anything `decode` understands
#[derive(Debug, Clone, PartialEq)]
pub enum SceneInput {
    /// A viewer URL, a state URL or a raw JSON document
    Text(String),
    /// An already-parsed JSON document
    Value(Value),
}

impl From<&str> for SceneInput {
    fn from(text: &str) -> Self {
        SceneInput::Text(text.to_string())
    }
}

impl From<String> for SceneInput {
    fn from(text: String) -> Self {
        SceneInput::Text(text)
    }
}

impl From<&String> for SceneInput {
    fn from(text: &String) -> Self {
        SceneInput::Text(text.clone())
    }
}

impl From<Value> for SceneInput {
    fn from(value: Value) -> Self {
        SceneInput::Value(value)
    }
}

/// Decode a scene from a URL, a JSON string or a parsed document.
///
/// State URLs need a state service; use [`decode_with`] for those.
pub fn decode(input: impl Into<SceneInput>) -> Result<Scene> {
    decode_with(input, None)
}

/// Decode a scene, resolving state handles through `service`
pub fn decode_with(
    input: impl Into<SceneInput>,
    service: Option<&dyn StateService>,
) -> Result<Scene> {
    match input.into() {
        SceneInput::Value(document) => {
            debug!("Decoding scene from a parsed document");
            json::from_value(document, None)
        }
        SceneInput::Text(text) => {
            let text = text.trim();
            if url::is_url(text) {
                decode_url(text, service)
            } else {
                debug!("Decoding scene from a JSON string");
                json::from_str(text, None)
            }
        }
    }
}

fn decode_url(text: &str, service: Option<&dyn StateService>) -> Result<Scene> {
    match url::parse(text)? {
        ViewerUrl::Embedded { base_url, json: text } => {
            debug!(base_url = %base_url, "Decoding scene from an embedded URL fragment");
            json::from_str(&text, Some(base_url))
        }
        ViewerUrl::State { base_url, handle } => {
            let service = service.ok_or_else(|| {
                SceneError::decode(format!(
                    "URL references state '{}' but no state service was given",
                    handle
                ))
            })?;
            debug!(handle = %handle, "Fetching scene from state service");
            let document = service.fetch(&handle)?;
            json::from_value(document, Some(base_url))
        }
    }
}

impl Scene {
    /// The scene as a JSON document
    pub fn to_value(&self) -> Value {
        json::to_value(self)
    }

    /// Serialize the scene document; keys are sorted
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        json::to_json(self, pretty)
    }

    /// Viewer URL with the scene embedded in the fragment.
    ///
    /// Uses the scene's base URL, or the public demo deployment when unset.
    pub fn to_url(&self) -> Result<String> {
        let base_url = self.base_url().unwrap_or(DEFAULT_BASE_URL);
        Ok(url::embed(base_url, &self.to_json(false)?))
    }

    /// Parse a raw JSON scene document
    pub fn from_json(text: &str) -> Result<Scene> {
        json::from_str(text, None)
    }

    /// Build a scene from a parsed JSON document
    pub fn from_value(document: Value) -> Result<Scene> {
        json::from_value(document, None)
    }

    /// SHA-256 of the scene's JSON form
    pub fn fingerprint(&self) -> Result<String> {
        fingerprint(&self.to_value())
    }
}

impl FromStr for Scene {
    type Err = SceneError;

    fn from_str(text: &str) -> Result<Scene> {
        decode(text)
    }
}

impl Serialize for Scene {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Scene {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        json::from_value(document, None).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::remote::{MemoryStateService, StateService};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Scene {
        let mut scene = Scene::from_layers([
            Layer::image("precomputed://gs://bucket/em"),
            Layer::segmentation("precomputed://gs://bucket/seg").with_segments([1]),
        ]);
        scene.set_setting("layout", "xy-3d").unwrap();
        scene
    }

    #[test]
    fn test_json_round_trip() {
        let scene = sample();
        let decoded = decode(scene.to_json(true).unwrap()).unwrap();
        assert_eq!(decoded, scene);
    }

    #[test]
    fn test_value_round_trip() {
        let scene = sample();
        assert_eq!(decode(scene.to_value()).unwrap(), scene);
    }

    #[test]
    fn test_url_round_trip_keeps_base() {
        let scene = sample().with_base_url("https://ngl.example.org/");
        let url = scene.to_url().unwrap();
        assert!(url.starts_with("https://ngl.example.org/#!%7B"));
        assert_eq!(decode(&url).unwrap(), scene);
    }

    #[test]
    fn test_url_round_trip_with_state_in_base_path() {
        let scene = sample().with_base_url("https://ngl.example.org/state/viewer/");
        assert_eq!(decode(scene.to_url().unwrap()).unwrap(), scene);
    }

    #[test]
    fn test_default_base_url() {
        let url = Scene::new().to_url().unwrap();
        assert!(url.starts_with(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_from_str() {
        let scene: Scene = r#"{"layers": [{"type": "mesh", "source": "precomputed://x/meshes"}]}"#
            .parse()
            .unwrap();
        assert_eq!(scene.layer(0).unwrap().name(), "meshes");
    }

    #[test]
    fn test_state_url_needs_service() {
        let err = decode("https://ngl.example.org/state/abc").unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }

    #[test]
    fn test_state_url_resolved() {
        let service = MemoryStateService::new();
        let handle = service.create(&sample().to_value()).unwrap();
        let url = format!("https://ngl.example.org/state/{}", handle);

        let scene = decode_with(url.as_str(), Some(&service)).unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.base_url(), Some("https://ngl.example.org/"));
    }

    #[test]
    fn test_url_without_fragment_fails() {
        assert!(decode("https://ngl.example.org/").is_err());
    }

    #[test]
    fn test_serde_impls() {
        let scene = sample();
        let text = serde_json::to_string(&scene).unwrap();
        let back: Scene = serde_json::from_str(&text).unwrap();
        assert_eq!(back, scene);
        assert!(serde_json::from_value::<Scene>(json!([1])).is_err());
    }
}
