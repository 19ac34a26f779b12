//! JSON form of a scene
//!
//! A scene document is one object: the top-level settings with the
//! ordered `layers` array alongside. Object keys come out sorted.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, SceneError};
use crate::layers::Layer;
use crate::scene::Scene;

const LAYERS: &str = "layers";

/// The scene as a JSON document
pub fn to_value(scene: &Scene) -> Value {
    let mut document = scene.settings().clone();
    let layers = scene.layers().iter().map(Layer::to_value).collect();
    document.insert(LAYERS.to_string(), Value::Array(layers));
    Value::Object(document)
}

/// Serialize the scene document, optionally pretty-printed
pub fn to_json(scene: &Scene, pretty: bool) -> Result<String> {
    let document = to_value(scene);
    let text = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(text)
}

/// Build a scene from a parsed document.
///
/// Everything except `layers` becomes a top-level setting. A missing
/// `layers` key means no layers; any malformed layer fails the whole call.
pub fn from_value(document: Value, base_url: Option<String>) -> Result<Scene> {
    let mut document = match document {
        Value::Object(map) => map,
        other => {
            return Err(SceneError::decode(format!(
                "expected a scene object, got {}",
                type_name(&other)
            )))
        }
    };

    let layers = match document.remove(LAYERS) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(Layer::from_value)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(SceneError::decode(format!(
                "'layers' must be an array, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(Scene::from_parts(base_url, layers, document))
}

/// Parse a JSON scene document
pub fn from_str(text: &str, base_url: Option<String>) -> Result<Scene> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| SceneError::decode(format!("malformed JSON: {}", e)))?;
    from_value(document, base_url)
}

/// SHA-256 of a document's compact JSON, used to tell whether it changed
pub fn fingerprint(document: &Value) -> Result<String> {
    let text = serde_json::to_string(document)?;
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_to_value_layout() {
        let mut scene = Scene::from_layers([Layer::image("a://img")]);
        scene.set_setting("layout", "xy-3d").unwrap();

        let document = to_value(&scene);
        assert_eq!(document["layout"], json!("xy-3d"));
        assert_eq!(document["layers"][0]["type"], json!("image"));
        assert_eq!(document["layers"][0]["name"], json!("img"));
    }

    #[test]
    fn test_keys_sorted() {
        let mut scene = Scene::new();
        scene.set_setting("zoom", 1).unwrap();
        scene.set_setting("axis", 2).unwrap();
        let text = to_json(&scene, false).unwrap();
        assert_eq!(text, r#"{"axis":2,"layers":[],"zoom":1}"#);
    }

    #[test]
    fn test_missing_layers_is_empty() {
        let scene = from_str(r#"{"layout": "3d"}"#, None).unwrap();
        assert!(scene.is_empty());
        assert_eq!(scene.setting("layout"), Some(&json!("3d")));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(from_str("{not json", None).is_err());
        assert!(from_str("[1, 2]", None).is_err());
        assert!(from_str(r#"{"layers": {}}"#, None).is_err());
        // one bad layer spoils the whole document
        let err = from_str(
            r#"{"layers": [{"type": "image", "source": "a://x"}, {"type": "mesh"}]}"#,
            None,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = fingerprint(&json!({"a": 1})).unwrap();
        let b = fingerprint(&json!({"a": 1})).unwrap();
        let c = fingerprint(&json!({"a": 2})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
