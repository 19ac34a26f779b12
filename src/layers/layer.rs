//! Layer
//!
//! A layer is an open mapping of JSON properties plus an immutable kind.
//! Named accessors (`segments`, `visible`, `color`, ...) read and write the
//! same keys as [`Layer::get`]/[`Layer::set`], so both styles stay in step.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::LayerKind;
use crate::error::{Result, SceneError};

const TYPE: &str = "type";
const NAME: &str = "name";
const SOURCE: &str = "source";
const SEGMENTS: &str = "segments";
const VISIBLE: &str = "visible";
const OPACITY: &str = "opacity";
const COLOR: &str = "color";

static NULL: Value = Value::Null;

/// Wire form of a layer: the property mapping with `type` alongside
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LayerRepr {
    #[serde(rename = "type")]
    tag: String,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

/// One data-source-backed layer of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayerRepr", into = "LayerRepr")]
pub struct Layer {
    kind: LayerKind,
    /// `type` string as written on the wire
    tag: String,
    /// Everything except `type`; always holds `name` and `source`
    properties: Map<String, Value>,
}

impl Layer {
    /// Create a layer of `kind` reading from `source`, with the kind's defaults
    pub fn new(kind: LayerKind, source: impl Into<String>) -> Self {
        Self::build(kind, kind.default_tag().to_string(), source.into())
    }

    /// Image layer: visible, default blending, no shader controls
    pub fn image(source: impl Into<String>) -> Self {
        Self::new(LayerKind::Image, source)
    }

    /// Segmentation layer with an empty segment selection
    pub fn segmentation(source: impl Into<String>) -> Self {
        Self::new(LayerKind::Segmentation, source)
    }

    /// Annotation layer, visible
    pub fn annotation(source: impl Into<String>) -> Self {
        Self::new(LayerKind::Annotation, source)
    }

    /// Mesh layer; carries only `name` and `source`
    pub fn mesh(source: impl Into<String>) -> Self {
        Self::new(LayerKind::Mesh, source)
    }

    /// Skeleton layer served by a local viewer, in nanometres
    pub fn local_skeleton(source: impl Into<String>) -> Self {
        Self::new(LayerKind::LocalSkeleton, source)
    }

    /// A layer of a type this crate has no variant for, e.g. `"pointAnnotation"`
    pub fn generic(tag: impl Into<String>, source: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::build(LayerKind::from_tag(&tag), tag, source.into())
    }

    fn build(kind: LayerKind, tag: String, source: String) -> Self {
        let mut properties = kind.defaults();
        let name = derive_name(&source).unwrap_or_else(|| kind.default_name().to_string());
        properties.insert(NAME.to_string(), Value::String(name));
        properties.insert(SOURCE.to_string(), Value::String(source));
        Self {
            kind,
            tag,
            properties,
        }
    }

    /// Rebuild a layer from its wire parts.
    ///
    /// `properties` are kept as given; kind defaults belong to the
    /// constructors only. A missing `name` is derived from the source.
    pub fn from_parts(tag: impl Into<String>, mut properties: Map<String, Value>) -> Result<Self> {
        let tag = tag.into();
        let kind = LayerKind::from_tag(&tag);

        let source = properties.get(SOURCE).ok_or_else(|| SceneError::LayerError {
            reason: format!("{} layer has no source", tag),
        })?;
        check_source(source)?;
        if let Some(name) = properties.get(NAME) {
            check_name(name)?;
        }
        if kind.has_segments() {
            if let Some(segments) = properties.get(SEGMENTS) {
                check_segments(segments)?;
            }
        }

        if !properties.contains_key(NAME) {
            let name = properties
                .get(SOURCE)
                .and_then(source_url_of)
                .and_then(derive_name)
                .unwrap_or_else(|| kind.default_name().to_string());
            properties.insert(NAME.to_string(), Value::String(name));
        }

        Ok(Self {
            kind,
            tag,
            properties,
        })
    }

    /// Layer kind (fixed at construction)
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// The `type` string written to JSON
    pub fn type_tag(&self) -> &str {
        &self.tag
    }

    /// Display name, matched by name lookup
    pub fn name(&self) -> &str {
        self.properties
            .get(NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Rename the layer
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.properties
            .insert(NAME.to_string(), Value::String(name.into()));
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    /// Raw source value: a URI string or an object with a `url` member
    pub fn source(&self) -> &Value {
        self.properties.get(SOURCE).unwrap_or(&NULL)
    }

    /// The source URI, looking inside object sources
    pub fn source_url(&self) -> &str {
        source_url_of(self.source()).unwrap_or_default()
    }

    /// All properties except `type`
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Raw property value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Get a property deserialized into `T`, if present and well-typed
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Set a property.
    ///
    /// `type` cannot be set. `name` must be a string and `source` a string
    /// or an object. On kinds with a selection, `segments` must be an array
    /// of integer or string IDs.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            TYPE => {
                return Err(SceneError::LayerError {
                    reason: format!("the type of layer '{}' cannot be changed", self.name()),
                })
            }
            NAME => check_name(&value)?,
            SOURCE => check_source(&value)?,
            SEGMENTS if self.kind.has_segments() => check_segments(&value)?,
            _ => {}
        }
        self.properties.insert(key, value);
        Ok(())
    }

    /// Builder form of [`Layer::set`]. Edits `set` would reject are skipped.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Err(e) = self.set(key, value) {
            tracing::debug!("ignoring layer property: {}", e);
        }
        self
    }

    /// Remove a property. `name` and `source` are required and cannot be removed.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        if key == NAME || key == SOURCE {
            return Err(SceneError::LayerError {
                reason: format!("'{}' is required on every layer", key),
            });
        }
        Ok(self.properties.remove(key))
    }

    /// The `visible` flag, if set
    pub fn visible(&self) -> Option<bool> {
        self.properties.get(VISIBLE).and_then(Value::as_bool)
    }

    /// Show or hide the layer
    pub fn set_visible(&mut self, visible: bool) {
        self.properties
            .insert(VISIBLE.to_string(), Value::Bool(visible));
    }

    /// The `opacity` property, if numeric
    pub fn opacity(&self) -> Option<f64> {
        self.properties.get(OPACITY).and_then(Value::as_f64)
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.properties
            .insert(OPACITY.to_string(), Value::from(opacity));
    }

    /// The `color` property, if a string
    pub fn color(&self) -> Option<&str> {
        self.properties.get(COLOR).and_then(Value::as_str)
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.properties
            .insert(COLOR.to_string(), Value::String(color.into()));
    }

    /// Selected segment IDs.
    ///
    /// IDs are returned as strings, the form the viewer itself writes;
    /// numeric entries are converted. Fails for kinds without a selection.
    pub fn segments(&self) -> Result<Vec<String>> {
        self.require_segments()?;
        Ok(self.segment_ids())
    }

    /// Replace the segment selection
    pub fn set_segments<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.require_segments()?;
        let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        self.write_segments(ids);
        Ok(())
    }

    /// Add segment IDs that are not selected yet
    pub fn add_segments<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.require_segments()?;
        let mut current = self.segment_ids();
        for id in ids {
            let id = id.to_string();
            if !current.contains(&id) {
                current.push(id);
            }
        }
        self.write_segments(current);
        Ok(())
    }

    /// Deselect every segment
    pub fn clear_segments(&mut self) -> Result<()> {
        self.set_segments(Vec::<String>::new())
    }

    /// Builder form of [`Layer::set_segments`]; a no-op on kinds without segments
    pub fn with_segments<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        if let Err(e) = self.set_segments(ids) {
            tracing::debug!("ignoring segments: {}", e);
        }
        self
    }

    fn require_segments(&self) -> Result<()> {
        if self.kind.has_segments() {
            Ok(())
        } else {
            Err(SceneError::LayerError {
                reason: format!("{} layer '{}' has no segment selection", self.kind, self.name()),
            })
        }
    }

    fn segment_ids(&self) -> Vec<String> {
        match self.properties.get(SEGMENTS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn write_segments(&mut self, ids: Vec<String>) {
        let ids = ids.into_iter().map(Value::String).collect();
        self.properties
            .insert(SEGMENTS.to_string(), Value::Array(ids));
    }

    /// Same kind and same source URL. Generic layers must also share a tag.
    pub fn is_equivalent(&self, other: &Layer) -> bool {
        if self.kind != other.kind || self.source_url() != other.source_url() {
            return false;
        }
        self.kind != LayerKind::Generic || self.tag == other.tag
    }

    /// Merge an equivalent layer into a copy of this one.
    ///
    /// Segment selections are unioned. For every other property the value
    /// from `other` wins; properties only `self` has are kept.
    pub fn merge(&self, other: &Layer) -> Result<Layer> {
        let mut merged = self.clone();
        merged.merge_in_place(other)?;
        Ok(merged)
    }

    /// In-place form of [`Layer::merge`]
    pub fn merge_in_place(&mut self, other: &Layer) -> Result<()> {
        if !self.is_equivalent(other) {
            return Err(SceneError::IncompatibleLayer {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        self.absorb(other);
        Ok(())
    }

    /// Merge without the equivalence check; callers have already matched.
    pub(crate) fn absorb(&mut self, other: &Layer) {
        let union = if self.kind.has_segments() {
            let mut ids = self.segment_ids();
            for id in other.segment_ids() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Some(ids)
        } else {
            None
        };

        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }

        if let Some(ids) = union {
            self.write_segments(ids);
        }
    }

    /// The layer as a JSON object, `type` included
    pub fn to_value(&self) -> Value {
        let mut map = self.properties.clone();
        map.insert(TYPE.to_string(), Value::String(self.tag.clone()));
        Value::Object(map)
    }

    /// Parse a JSON layer object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(mut map) => {
                let tag = match map.remove(TYPE) {
                    Some(Value::String(tag)) => tag,
                    Some(other) => {
                        return Err(SceneError::decode(format!(
                            "layer type must be a string, got {}",
                            other
                        )))
                    }
                    None => return Err(SceneError::decode("layer has no type")),
                };
                Self::from_parts(tag, map).map_err(|e| SceneError::decode(e.to_string()))
            }
            other => Err(SceneError::decode(format!(
                "expected a layer object, got {}",
                other
            ))),
        }
    }
}

impl TryFrom<LayerRepr> for Layer {
    type Error = SceneError;

    fn try_from(repr: LayerRepr) -> Result<Self> {
        Layer::from_parts(repr.tag, repr.properties)
    }
}

impl From<Layer> for LayerRepr {
    fn from(layer: Layer) -> Self {
        LayerRepr {
            tag: layer.tag,
            properties: layer.properties,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LayerKind::Image => "Image",
            LayerKind::Segmentation => "Segmentation",
            LayerKind::Annotation => "Annotation",
            LayerKind::Mesh => "Mesh",
            LayerKind::LocalSkeleton => "LocalSkeleton",
            LayerKind::Generic => self.tag.as_str(),
        };
        write!(f, "<{}(name={}, source={}", kind, self.name(), self.source_url())?;
        if self.kind.has_segments() {
            write!(f, ", selected segments={}", self.segment_ids().len())?;
        }
        write!(f, ")>")
    }
}

fn source_url_of(source: &Value) -> Option<&str> {
    match source {
        Value::String(url) => Some(url),
        Value::Object(map) => map.get("url").and_then(Value::as_str),
        _ => None,
    }
}

fn check_source(value: &Value) -> Result<()> {
    match value {
        Value::String(_) | Value::Object(_) => Ok(()),
        other => Err(SceneError::LayerError {
            reason: format!("layer source must be a URI or an object, got {}", other),
        }),
    }
}

fn check_segments(value: &Value) -> Result<()> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(SceneError::LayerError {
                reason: format!("segments must be an array, got {}", other),
            })
        }
    };
    match items.iter().find(|item| !is_segment_id(item)) {
        None => Ok(()),
        Some(bad) => Err(SceneError::LayerError {
            reason: format!("segment IDs must be integers or strings, got {}", bad),
        }),
    }
}

fn is_segment_id(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Number(n) => n.is_u64() || n.is_i64(),
        _ => false,
    }
}

fn check_name(value: &Value) -> Result<()> {
    if value.is_string() {
        Ok(())
    } else {
        Err(SceneError::LayerError {
            reason: format!("layer name must be a string, got {}", value),
        })
    }
}

/// Last path segment of a source URI, ignoring scheme prefixes
/// (`precomputed://gs://bucket/seg#type=mesh` gives `seg`).
fn derive_name(source: &str) -> Option<String> {
    let mut rest = source;
    while let Some(idx) = rest.find("://") {
        rest = &rest[idx + 3..];
    }
    let rest = rest.split(|c| c == '#' || c == '?').next().unwrap_or(rest);
    rest.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
