//! Scene Document Module
//!
//! - `Scene`: ordered layers plus top-level viewer settings
//! - `LayerRef`: index-or-name layer addressing
//! - `SceneSummary`: per-kind counts for display

mod document;
mod lookup;
mod summary;

pub use document::Scene;
pub use lookup::LayerRef;
pub use summary::SceneSummary;
