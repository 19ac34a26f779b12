//! Layer kinds
//!
//! The closed set of layer variants. Per-kind behaviour (defaults, wire
//! tags, whether a segment selection exists) is a `match` on the kind.

use std::fmt;

use serde_json::{json, Map, Value};

/// Kind of data a layer displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Raw image volume
    Image,
    /// Segmentation volume with a segment selection
    Segmentation,
    /// Point/line annotations
    Annotation,
    /// Standalone mesh source
    Mesh,
    /// Skeletons served to a local viewer process
    LocalSkeleton,
    /// Any layer type this crate has no special handling for
    Generic,
}

impl LayerKind {
    /// All kinds, in the order summaries list them
    pub const ALL: [LayerKind; 6] = [
        LayerKind::Image,
        LayerKind::Segmentation,
        LayerKind::Annotation,
        LayerKind::Mesh,
        LayerKind::LocalSkeleton,
        LayerKind::Generic,
    ];

    /// The `type` string written for a freshly constructed layer
    pub fn default_tag(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Segmentation => "segmentation",
            Self::Annotation => "annotation",
            Self::Mesh => "mesh",
            Self::LocalSkeleton => "local-skeleton",
            Self::Generic => "generic",
        }
    }

    /// Map a wire `type` string to a kind. Unknown tags are `Generic`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "image" => Self::Image,
            "segmentation" | "segmentation_with_graph" => Self::Segmentation,
            "annotation" => Self::Annotation,
            "mesh" => Self::Mesh,
            "local-skeleton" | "local_skeleton" => Self::LocalSkeleton,
            _ => Self::Generic,
        }
    }

    /// Fallback name when none can be derived from the source
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Segmentation => "segmentation",
            Self::Annotation => "annotations",
            Self::Mesh => "meshes",
            Self::LocalSkeleton => "skeletons",
            Self::Generic => "layer",
        }
    }

    /// Whether layers of this kind carry a `segments` selection
    pub fn has_segments(&self) -> bool {
        matches!(self, Self::Segmentation | Self::LocalSkeleton)
    }

    /// Properties every new layer of this kind starts with
    pub(crate) fn defaults(&self) -> Map<String, Value> {
        let defaults = match self {
            Self::Image => json!({
                "visible": true,
                "blend": "default",
                "shaderControls": {},
            }),
            Self::Segmentation => json!({
                "segments": [],
                "selectedAlpha": 0.14,
                "skeletonRendering": {"mode2d": "lines_and_points", "mode3d": "lines"},
            }),
            Self::Annotation => json!({ "visible": true }),
            Self::LocalSkeleton => json!({
                "segments": [],
                "units": "nm",
                "scales": [1, 1, 1],
            }),
            Self::Mesh | Self::Generic => json!({}),
        };

        match defaults {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Image => write!(f, "image"),
            LayerKind::Segmentation => write!(f, "segmentation"),
            LayerKind::Annotation => write!(f, "annotation"),
            LayerKind::Mesh => write!(f, "mesh"),
            LayerKind::LocalSkeleton => write!(f, "local skeleton"),
            LayerKind::Generic => write!(f, "generic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LayerKind::Image)]
    #[test_case(LayerKind::Segmentation)]
    #[test_case(LayerKind::Annotation)]
    #[test_case(LayerKind::Mesh)]
    #[test_case(LayerKind::LocalSkeleton)]
    #[test_case(LayerKind::Generic)]
    fn test_tag_round_trip(kind: LayerKind) {
        assert_eq!(LayerKind::from_tag(kind.default_tag()), kind);
    }

    #[test]
    fn test_graph_segmentation_alias() {
        assert_eq!(
            LayerKind::from_tag("segmentation_with_graph"),
            LayerKind::Segmentation
        );
        assert_eq!(LayerKind::from_tag("pointAnnotation"), LayerKind::Generic);
    }

    #[test]
    fn test_defaults_have_segments_where_expected() {
        for kind in LayerKind::ALL {
            assert_eq!(
                kind.defaults().contains_key("segments"),
                kind.has_segments(),
                "{} defaults disagree with has_segments",
                kind
            );
        }
    }
}
