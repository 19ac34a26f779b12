//! ngscenes - Neuroglancer Scene Descriptions
//!
//! Build, edit, merge and share scenes for the neuroglancer viewer.
//!
//! # Architecture
//!
//! A scene is an ordered list of layers plus the viewer's top-level settings:
//! - Layers: a closed set of kinds, each wrapping an open property mapping
//! - Scenes: add/drop/lookup, `combine` (`+`) and `merge_with` (`|`)
//! - Codec: JSON documents and viewer URLs, in both directions
//! - Segment properties: the info document that labels and tags segment IDs
//!
//! Two scene variants talk to the outside world through narrow traits:
//! - `StateScene` stores its document on a state server (`StateService`)
//! - `LocalScene` mirrors every edit into a running viewer (`ViewerEndpoint`)
//!
//! # Example
//!
//! ```
//! use ngscenes::{Layer, Scene};
//!
//! let mut scene = Scene::new();
//! scene.add_layer(Layer::image("precomputed://gs://bucket/em"));
//! scene.add_layer(Layer::segmentation("precomputed://gs://bucket/seg").with_segments([1]));
//!
//! let url = scene.to_url().unwrap();
//! let decoded = ngscenes::decode(&url).unwrap();
//! assert_eq!(decoded.layers(), scene.layers());
//! ```

pub mod codec;
pub mod config;
pub mod desktop;
pub mod error;
pub mod layers;
pub mod properties;
pub mod remote;
pub mod scene;
pub mod sync;

pub use codec::{decode, decode_with, SceneInput};
pub use config::SceneConfig;
pub use desktop::{ClipboardContent, Desktop};
pub use error::{Result, SceneError};
pub use layers::{Layer, LayerKind};
pub use properties::{PropertyKind, SegmentProperties, SegmentProperty};
pub use remote::{StateScene, StateService};
pub use scene::{LayerRef, Scene, SceneSummary};
pub use sync::{LocalScene, SyncState, ViewerEndpoint};
