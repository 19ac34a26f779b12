//! Viewer URLs
//!
//! Embedded scenes live in the URL fragment: `<base_url>/#!<percent-encoded JSON>`.
//! State-server scenes reference a handle instead. Three handle forms are
//! recognised:
//! - `<base_url>/state/<handle>`
//! - `<base_url>/?json_url=<url of the JSON document>`
//! - `<base_url>/#!gs://<bucket>/<path>`

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::{Result, SceneError};

/// Characters left as-is when quoting: alphanumerics plus `_.-~/`
const QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

const STATE_SEGMENT: &str = "state/";
const JSON_URL_PARAM: &str = "json_url=";

/// What a viewer URL points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerUrl {
    /// Scene JSON embedded in the fragment (already percent-decoded)
    Embedded { base_url: String, json: String },
    /// Scene stored on a state server under `handle`
    State { base_url: String, handle: String },
}

/// Ensure a base URL ends with `/` so fragments and paths attach to it
pub fn normalize_base(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

/// `<base_url>/#!<json>` with the JSON percent-encoded
pub fn embed(base_url: &str, json: &str) -> String {
    format!(
        "{}#!{}",
        normalize_base(base_url),
        utf8_percent_encode(json, QUOTE)
    )
}

/// Short URL referencing a stored scene.
///
/// `gs://` handles go in the fragment, `http(s)://` handles in the
/// `json_url` query, anything else under `state/`.
pub fn state_url(base_url: &str, handle: &str) -> String {
    let base_url = normalize_base(base_url);
    if let Some(path) = handle.strip_prefix("gs://") {
        format!("{}#!gs://{}", base_url, path)
    } else if handle.starts_with("http://") || handle.starts_with("https://") {
        format!("{}?{}{}", base_url, JSON_URL_PARAM, handle)
    } else {
        format!(
            "{}{}{}",
            base_url,
            STATE_SEGMENT,
            utf8_percent_encode(handle, QUOTE)
        )
    }
}

/// True for strings with a scheme, a host and a path
pub fn is_url(text: &str) -> bool {
    match Url::parse(text.trim()) {
        Ok(url) => url.host().is_some() && !url.path().is_empty(),
        Err(_) => false,
    }
}

/// Split a viewer URL into its base and its scene reference.
///
/// A fragment always wins over the path, so base URLs that themselves
/// contain `/state/` still embed scenes.
pub fn parse(text: &str) -> Result<ViewerUrl> {
    let text = text.trim();
    if !is_url(text) {
        return Err(SceneError::decode(format!("not a viewer URL: {}", text)));
    }

    let (before_fragment, fragment) = match text.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (text, None),
    };

    if let Some(path) = fragment.and_then(|f| f.strip_prefix("!gs://")) {
        return Ok(ViewerUrl::State {
            base_url: before_fragment.to_string(),
            handle: format!("gs://{}", decode_component(path)?),
        });
    }

    if let Some((base, query)) = before_fragment.split_once('?') {
        if let Some(handle) = query
            .split('&')
            .find_map(|pair| pair.strip_prefix(JSON_URL_PARAM))
        {
            return Ok(ViewerUrl::State {
                base_url: base.to_string(),
                handle: decode_component(handle)?,
            });
        }
    }

    if let Some(fragment) = fragment {
        let encoded = fragment.strip_prefix('!').unwrap_or(fragment);
        if encoded.is_empty() {
            return Err(SceneError::decode("URL has an empty scene fragment"));
        }
        return Ok(ViewerUrl::Embedded {
            base_url: before_fragment.to_string(),
            json: decode_component(encoded)?,
        });
    }

    if let Some(idx) = before_fragment.rfind(&format!("/{}", STATE_SEGMENT)) {
        let handle = &before_fragment[idx + 1 + STATE_SEGMENT.len()..];
        if !handle.is_empty() {
            return Ok(ViewerUrl::State {
                base_url: before_fragment[..=idx].to_string(),
                handle: decode_component(handle)?,
            });
        }
    }

    Err(SceneError::decode(format!(
        "URL has neither a scene fragment nor a state handle: {}",
        text
    )))
}

fn decode_component(encoded: &str) -> Result<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SceneError::decode(format!("invalid percent-encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embed_percent_encodes_json() {
        let url = embed("https://ngl.example.org", r#"{"a":"b c/d"}"#);
        assert_eq!(
            url,
            "https://ngl.example.org/#!%7B%22a%22%3A%22b%20c/d%22%7D"
        );
    }

    #[test]
    fn test_parse_embedded() {
        let url = embed("https://ngl.example.org/", r#"{"layout":"3d"}"#);
        assert_eq!(
            parse(&url).unwrap(),
            ViewerUrl::Embedded {
                base_url: "https://ngl.example.org/".to_string(),
                json: r#"{"layout":"3d"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_parse_unencoded_colons() {
        // neuroglancer itself leaves ':' unescaped
        let parsed = parse("https://host/#!%7B%22layout%22:%22xy%22%7D").unwrap();
        match parsed {
            ViewerUrl::Embedded { json, .. } => assert_eq!(json, r#"{"layout":"xy"}"#),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_state_path() {
        let url = state_url("https://ngl.example.org", "abc123");
        assert_eq!(url, "https://ngl.example.org/state/abc123");
        assert_eq!(
            parse(&url).unwrap(),
            ViewerUrl::State {
                base_url: "https://ngl.example.org/".to_string(),
                handle: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_json_url() {
        let parsed =
            parse("https://ngl.example.org/?json_url=https://state.example.org/nglstate/123")
                .unwrap();
        assert_eq!(
            parsed,
            ViewerUrl::State {
                base_url: "https://ngl.example.org/".to_string(),
                handle: "https://state.example.org/nglstate/123".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_gs_fragment() {
        let parsed = parse("https://ngl.example.org/#!gs://bucket/scene.json").unwrap();
        assert_eq!(
            parsed,
            ViewerUrl::State {
                base_url: "https://ngl.example.org/".to_string(),
                handle: "gs://bucket/scene.json".to_string(),
            }
        );
    }

    #[test]
    fn test_state_url_forms_parse_back() {
        for handle in [
            "5f1c9a",
            "gs://bucket/scenes/a.json",
            "https://state.example.org/nglstate/123",
        ] {
            let url = state_url("https://ngl.example.org", handle);
            match parse(&url).unwrap() {
                ViewerUrl::State { base_url, handle: parsed } => {
                    assert_eq!(base_url, "https://ngl.example.org/");
                    assert_eq!(parsed, handle);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_state_in_base_path_still_embeds() {
        let url = embed("https://ngl.example.org/state/viewer/", r#"{"layers":[]}"#);
        assert_eq!(
            parse(&url).unwrap(),
            ViewerUrl::Embedded {
                base_url: "https://ngl.example.org/state/viewer/".to_string(),
                json: r#"{"layers":[]}"#.to_string(),
            }
        );
        // without a fragment the same path is a state handle
        match parse("https://ngl.example.org/state/viewer").unwrap() {
            ViewerUrl::State { handle, .. } => assert_eq!(handle, "viewer"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse("https://ngl.example.org/").is_err());
        assert!(parse("https://ngl.example.org/#!").is_err());
        assert!(parse(r#"{"layers": []}"#).is_err());
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://neuroglancer-demo.appspot.com/"));
        assert!(!is_url(r#"{"layers": []}"#));
        assert!(!is_url("not a url"));
    }
}
