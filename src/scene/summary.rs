//! Scene summary
//!
//! Per-kind layer counts, for display only.

use std::fmt;

use serde::Serialize;

use crate::layers::{Layer, LayerKind};

/// Number of layers of each kind in a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    pub image: usize,
    pub segmentation: usize,
    pub annotation: usize,
    pub mesh: usize,
    pub local_skeleton: usize,
    pub generic: usize,
}

impl SceneSummary {
    pub(crate) fn count<'a>(layers: impl IntoIterator<Item = &'a Layer>) -> Self {
        let mut summary = SceneSummary {
            image: 0,
            segmentation: 0,
            annotation: 0,
            mesh: 0,
            local_skeleton: 0,
            generic: 0,
        };
        for layer in layers {
            match layer.kind() {
                LayerKind::Image => summary.image += 1,
                LayerKind::Segmentation => summary.segmentation += 1,
                LayerKind::Annotation => summary.annotation += 1,
                LayerKind::Mesh => summary.mesh += 1,
                LayerKind::LocalSkeleton => summary.local_skeleton += 1,
                LayerKind::Generic => summary.generic += 1,
            }
        }
        summary
    }

    /// Count for a single kind
    pub fn get(&self, kind: LayerKind) -> usize {
        match kind {
            LayerKind::Image => self.image,
            LayerKind::Segmentation => self.segmentation,
            LayerKind::Annotation => self.annotation,
            LayerKind::Mesh => self.mesh,
            LayerKind::LocalSkeleton => self.local_skeleton,
            LayerKind::Generic => self.generic,
        }
    }

    pub fn total(&self) -> usize {
        LayerKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = LayerKind::ALL
            .iter()
            .map(|kind| format!("{} {}", self.get(*kind), kind))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
