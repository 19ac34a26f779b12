//! Layer Model Module
//!
//! Layers are the visual elements of a scene:
//! - `LayerKind`: closed set of variants (image, segmentation, ...)
//! - `Layer`: a kind plus an open JSON property mapping

mod kind;
mod layer;

pub use kind::LayerKind;
pub use layer::Layer;
