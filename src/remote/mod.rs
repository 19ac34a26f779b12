//! Remote State Module
//!
//! Scenes too large for a URL fragment are stored on a JSON state server
//! and referenced by a short handle.
//! - `StateService`: create/fetch/update by handle
//! - `HttpStateService`: blocking HTTP client (feature `http`)
//! - `MemoryStateService`: in-process store for tests
//! - `StateScene`: a scene that encodes to a state URL

mod http;
mod memory;
mod state_scene;

use serde_json::Value;

use crate::error::Result;

pub use http::HttpStateService;
pub use memory::MemoryStateService;
pub use state_scene::StateScene;

/// A service that stores JSON documents under opaque handles.
///
/// Every failure is reported as `SceneError::RemoteService`.
pub trait StateService: Send + Sync {
    /// Store a new document and return its handle
    fn create(&self, document: &Value) -> Result<String>;

    /// Retrieve the document stored under `handle`
    fn fetch(&self, handle: &str) -> Result<Value>;

    /// Replace the document stored under `handle`
    fn update(&self, handle: &str, document: &Value) -> Result<()>;
}

impl<T: StateService + ?Sized> StateService for &T {
    fn create(&self, document: &Value) -> Result<String> {
        (**self).create(document)
    }

    fn fetch(&self, handle: &str) -> Result<Value> {
        (**self).fetch(handle)
    }

    fn update(&self, handle: &str, document: &Value) -> Result<()> {
        (**self).update(handle, document)
    }
}

impl<T: StateService + ?Sized> StateService for Box<T> {
    fn create(&self, document: &Value) -> Result<String> {
        (**self).create(document)
    }

    fn fetch(&self, handle: &str) -> Result<Value> {
        (**self).fetch(handle)
    }

    fn update(&self, handle: &str, document: &Value) -> Result<()> {
        (**self).update(handle, document)
    }
}
