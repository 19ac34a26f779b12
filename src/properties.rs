//! Segment Properties
//!
//! Builds the `neuroglancer_segment_properties` info document that
//! segmentation sources use to attach labels, free text, numbers and tags
//! to segment IDs:
//!
//! ```json
//! {"@type": "neuroglancer_segment_properties",
//!  "inline": {"ids": ["1", "2"], "properties": [{"type": "label", ...}]}}
//! ```
//!
//! Every property carries exactly one value per segment, in `ids` order.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{Result, SceneError};
use crate::remote::StateService;

const INFO_TYPE: &str = "neuroglancer_segment_properties";
const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Property kinds understood by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Label,
    Description,
    String,
    Number,
    Tags,
}

/// Storage type of a numeric property. The viewer only reads 32-bit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
}

/// One property column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SegmentProperty {
    Label {
        id: String,
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Description {
        id: String,
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        id: String,
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Number {
        id: String,
        data_type: NumberType,
        values: Vec<Number>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Tags {
        id: String,
        /// Tag names; `values` index into this list
        tags: Vec<String>,
        values: Vec<Vec<usize>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag_descriptions: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SegmentProperty {
    pub fn id(&self) -> &str {
        match self {
            Self::Label { id, .. }
            | Self::Description { id, .. }
            | Self::String { id, .. }
            | Self::Number { id, .. }
            | Self::Tags { id, .. } => id,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Label { .. } => PropertyKind::Label,
            Self::Description { .. } => PropertyKind::Description,
            Self::String { .. } => PropertyKind::String,
            Self::Number { .. } => PropertyKind::Number,
            Self::Tags { .. } => PropertyKind::Tags,
        }
    }

    /// Number of per-segment values
    pub fn len(&self) -> usize {
        match self {
            Self::Label { values, .. }
            | Self::Description { values, .. }
            | Self::String { values, .. } => values.len(),
            Self::Number { values, .. } => values.len(),
            Self::Tags { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for the segment at `index`, with tag indices resolved to names
    fn value_at(&self, index: usize) -> Option<Value> {
        match self {
            Self::Label { values, .. }
            | Self::Description { values, .. }
            | Self::String { values, .. } => values.get(index).cloned().map(Value::String),
            Self::Number { values, .. } => values.get(index).cloned().map(Value::Number),
            Self::Tags { tags, values, .. } => values.get(index).map(|indices| {
                indices
                    .iter()
                    .filter_map(|&i| tags.get(i).cloned().map(Value::String))
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Inline {
    ids: Vec<String>,
    #[serde(default)]
    properties: Vec<SegmentProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InfoRepr {
    #[serde(rename = "@type")]
    info_type: String,
    inline: Inline,
}

/// Properties for a fixed list of segment IDs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InfoRepr", into = "InfoRepr")]
pub struct SegmentProperties {
    ids: Vec<String>,
    properties: Vec<SegmentProperty>,
}

impl SegmentProperties {
    /// Empty property set for `ids`, which must be unique
    pub fn new<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        let mut seen = HashSet::new();
        if let Some(duplicate) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(property_error(format!("duplicate segment ID {}", duplicate)));
        }
        Ok(Self {
            ids,
            properties: Vec::new(),
        })
    }

    /// Segment IDs, in value order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> &[SegmentProperty] {
        &self.properties
    }

    pub fn property(&self, id: &str) -> Option<&SegmentProperty> {
        self.properties.iter().find(|p| p.id() == id)
    }

    /// `(id, kind)` for every property, in insertion order
    pub fn kinds(&self) -> Vec<(&str, PropertyKind)> {
        self.properties.iter().map(|p| (p.id(), p.kind())).collect()
    }

    /// Add a property column.
    ///
    /// Fails when the value count differs from the number of segments, the
    /// ID is taken, or a second label/description property is added.
    pub fn add_property(&mut self, property: SegmentProperty) -> Result<()> {
        self.check_property(&property)?;
        debug!(id = %property.id(), kind = ?property.kind(), "Added segment property");
        self.properties.push(property);
        Ok(())
    }

    /// Add text values: the first text property becomes the label, later
    /// ones plain strings.
    pub fn add_text<I, S>(&mut self, id: impl Into<String>, values: I) -> Result<PropertyKind>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let id = id.into();
        let values = values.into_iter().map(|v| v.to_string()).collect();
        let property = if self.has_kind(PropertyKind::Label) {
            debug!(id = %id, "Label already present, adding as string property");
            SegmentProperty::String {
                id,
                values,
                description: None,
            }
        } else {
            SegmentProperty::Label {
                id,
                values,
                description: None,
            }
        };
        let kind = property.kind();
        self.add_property(property)?;
        Ok(kind)
    }

    /// Add a free-text description per segment
    pub fn add_description<I, S>(&mut self, id: impl Into<String>, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.add_property(SegmentProperty::Description {
            id: id.into(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
            description: None,
        })
    }

    /// Add numeric values.
    ///
    /// Whole numbers that fit stay `int32`; anything else is stored as
    /// `float32`. NaN and infinities are rejected.
    pub fn add_number<I>(&mut self, id: impl Into<String>, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        let id = id.into();
        let values: Vec<f64> = values.into_iter().collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(property_error(format!(
                "number property '{}' contains NaN or infinite values",
                id
            )));
        }

        let integral = values
            .iter()
            .all(|v| v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64);
        let (data_type, values) = if integral {
            let values = values.iter().map(|&v| Number::from(v as i64)).collect();
            (NumberType::Int32, values)
        } else {
            let values = values.iter().filter_map(|&v| Number::from_f64(v)).collect();
            (NumberType::Float32, values)
        };

        self.add_property(SegmentProperty::Number {
            id,
            data_type,
            values,
            description: None,
        })
    }

    /// Add one tag per segment. Tags are listed in order of first use.
    pub fn add_category<I, S>(&mut self, id: impl Into<String>, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values: Vec<String> = values.into_iter().map(|v| clean_tag(&v.to_string())).collect();
        let mut tags: Vec<String> = Vec::new();
        for value in &values {
            if !tags.contains(value) {
                tags.push(value.clone());
            }
        }
        let values = values
            .iter()
            .map(|value| tags.iter().position(|t| t == value).into_iter().collect())
            .collect();

        self.add_property(SegmentProperty::Tags {
            id: id.into(),
            tags,
            values,
            tag_descriptions: None,
            description: None,
        })
    }

    /// Add any number of tags per segment. Tags are listed sorted.
    pub fn add_tags<I, T, S>(&mut self, id: impl Into<String>, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: ToString,
    {
        let values: Vec<Vec<String>> = values
            .into_iter()
            .map(|row| row.into_iter().map(|t| clean_tag(&t.to_string())).collect())
            .collect();
        let mut tags: Vec<String> = values.iter().flatten().cloned().collect();
        tags.sort();
        tags.dedup();

        let values = values
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|t| tags.binary_search(t).ok())
                    .collect()
            })
            .collect();

        self.add_property(SegmentProperty::Tags {
            id: id.into(),
            tags,
            values,
            tag_descriptions: None,
            description: None,
        })
    }

    /// All property values of one segment, keyed by property ID
    pub fn segment(&self, segment_id: &str) -> Option<Map<String, Value>> {
        let index = self.ids.iter().position(|id| id == segment_id)?;
        Some(
            self.properties
                .iter()
                .filter_map(|p| p.value_at(index).map(|v| (p.id().to_string(), v)))
                .collect(),
        )
    }

    /// The info document
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize the info document; keys are sorted
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    /// Parse an info document
    pub fn from_value(document: Value) -> Result<Self> {
        serde_json::from_value(document)
            .map_err(|e| SceneError::decode(format!("invalid segment properties: {}", e)))
    }

    /// Write the pretty-printed info document to `path`
    pub fn write_info(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json(true)?)?;
        debug!(path = %path.display(), "Wrote segment properties info file");
        Ok(())
    }

    /// Load properties for a data source.
    ///
    /// `source` is a precomputed source URL or the URL of an info file. A
    /// segmentation info that points at its properties through
    /// `segment_properties` is followed once.
    pub fn from_source(source: &str, service: &dyn StateService) -> Result<Self> {
        let url = info_url(source);
        let document = service.fetch(&url)?;
        if is_properties_info(&document) {
            return Self::from_value(document);
        }

        match document.get("segment_properties").and_then(Value::as_str) {
            Some(dir) => {
                let base = url.trim_end_matches("info").trim_end_matches('/');
                let nested = format!("{}/{}/info", base, dir.trim_matches('/'));
                debug!(url = %nested, "Following segment_properties reference");
                let document = service.fetch(&nested)?;
                if is_properties_info(&document) {
                    Self::from_value(document)
                } else {
                    Err(SceneError::decode(format!(
                        "{} is not a segment properties info file",
                        nested
                    )))
                }
            }
            None => Err(SceneError::decode(format!(
                "{} is not a segment properties info file",
                url
            ))),
        }
    }

    fn has_kind(&self, kind: PropertyKind) -> bool {
        self.properties.iter().any(|p| p.kind() == kind)
    }

    fn check_property(&self, property: &SegmentProperty) -> Result<()> {
        if property.len() != self.ids.len() {
            return Err(property_error(format!(
                "property '{}' has {} values for {} segments",
                property.id(),
                property.len(),
                self.ids.len()
            )));
        }
        if self.property(property.id()).is_some() {
            return Err(property_error(format!(
                "property '{}' already exists",
                property.id()
            )));
        }
        let kind = property.kind();
        if matches!(kind, PropertyKind::Label | PropertyKind::Description) && self.has_kind(kind) {
            return Err(property_error(format!(
                "only one {:?} property is allowed",
                kind
            )));
        }
        if let SegmentProperty::Tags { tags, values, .. } = property {
            if tags.iter().any(|t| t.starts_with('#') || t.contains(' ')) {
                return Err(property_error("tags must not start with '#' or contain spaces"));
            }
            if values.iter().flatten().any(|&i| i >= tags.len()) {
                return Err(property_error(format!(
                    "property '{}' references a tag that does not exist",
                    property.id()
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<InfoRepr> for SegmentProperties {
    type Error = SceneError;

    fn try_from(repr: InfoRepr) -> Result<Self> {
        if repr.info_type != INFO_TYPE {
            return Err(SceneError::decode(format!(
                "expected @type {}, got {}",
                INFO_TYPE, repr.info_type
            )));
        }
        let mut properties = SegmentProperties::new(repr.inline.ids)?;
        for property in repr.inline.properties {
            properties.check_property(&property)?;
            properties.properties.push(property);
        }
        Ok(properties)
    }
}

impl From<SegmentProperties> for InfoRepr {
    fn from(properties: SegmentProperties) -> Self {
        InfoRepr {
            info_type: INFO_TYPE.to_string(),
            inline: Inline {
                ids: properties.ids,
                properties: properties.properties,
            },
        }
    }
}

impl fmt::Display for SegmentProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SegmentProperties(segments={}, properties={})",
            self.ids.len(),
            self.len()
        )
    }
}

/// Info file URL for a source: drops `precomputed://`, maps `gs://` to the
/// public storage endpoint and appends `/info` when missing.
pub fn info_url(source: &str) -> String {
    let source = source.strip_prefix("precomputed://").unwrap_or(source);
    let url = match source.strip_prefix("gs://") {
        Some(path) => format!("{}/{}", GCS_ENDPOINT, path),
        None => source.to_string(),
    };
    if url.ends_with("info") {
        url
    } else {
        format!("{}/info", url.trim_end_matches('/'))
    }
}

fn is_properties_info(document: &Value) -> bool {
    document.get("@type").and_then(Value::as_str) == Some(INFO_TYPE)
}

/// Tags may not start with `#` or contain spaces
fn clean_tag(tag: &str) -> String {
    tag.strip_prefix('#').unwrap_or(tag).replace(' ', "_")
}

fn property_error(reason: impl Into<String>) -> SceneError {
    SceneError::PropertyError {
        reason: reason.into(),
    }
}
