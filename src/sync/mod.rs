//! Live Viewer Sync Module
//!
//! Keeps a local scene and a running viewer process consistent.
//! - `ViewerEndpoint`: get/set the viewer's full state
//! - `SyncAdapter`: Disconnected/Connected/Syncing state machine
//! - `LocalScene`: a scene that pushes every mutation to the viewer
//! - `HttpViewerEndpoint` (feature `http`) and `MemoryViewerEndpoint`

mod adapter;
mod http;
mod local_scene;
mod memory;

use serde_json::Value;

use crate::error::Result;

pub use adapter::{SyncAdapter, SyncState, SyncStatus};
pub use http::HttpViewerEndpoint;
pub use local_scene::LocalScene;
pub use memory::MemoryViewerEndpoint;

/// A locally running viewer, treated as a black box holding one document
pub trait ViewerEndpoint: Send + Sync {
    /// Address of the viewer
    fn url(&self) -> &str;

    /// The viewer's current scene document
    fn get_state(&self) -> Result<Value>;

    /// Replace the viewer's scene document
    fn set_state(&self, document: &Value) -> Result<()>;
}

impl<T: ViewerEndpoint + ?Sized> ViewerEndpoint for &T {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn get_state(&self) -> Result<Value> {
        (**self).get_state()
    }

    fn set_state(&self, document: &Value) -> Result<()> {
        (**self).set_state(document)
    }
}

impl<T: ViewerEndpoint + ?Sized> ViewerEndpoint for Box<T> {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn get_state(&self) -> Result<Value> {
        (**self).get_state()
    }

    fn set_state(&self, document: &Value) -> Result<()> {
        (**self).set_state(document)
    }
}
