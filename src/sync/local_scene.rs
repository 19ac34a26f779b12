//! Live scene bound to a running viewer
//!
//! Every mutation made through `LocalScene` is applied locally first and
//! then pushed as a full document. A failed push leaves the local change in
//! place; call `push` again to retry. Remote edits are picked up with
//! `refresh`, which never pushes back.

use std::fmt;
use std::ops::Deref;

use serde_json::Value;
use uuid::Uuid;

use super::adapter::{SyncAdapter, SyncStatus};
use super::ViewerEndpoint;
use crate::codec::json;
use crate::error::Result;
use crate::layers::Layer;
use crate::scene::{LayerRef, Scene};

/// A scene kept in sync with a local viewer
pub struct LocalScene<E: ViewerEndpoint> {
    scene: Scene,
    adapter: SyncAdapter<E>,
}

impl<E: ViewerEndpoint> LocalScene<E> {
    /// Bind `scene` to `endpoint` without contacting it yet
    pub fn new(endpoint: E, scene: Scene) -> Self {
        Self {
            scene,
            adapter: SyncAdapter::new(endpoint),
        }
    }

    /// Connect to the viewer and show `scene` in it
    pub fn connect(endpoint: E, scene: Scene) -> Result<Self> {
        let mut local = Self::new(endpoint, scene);
        local.reconnect()?;
        Ok(local)
    }

    /// Open a session (if needed) and push the current document
    pub fn reconnect(&mut self) -> Result<Uuid> {
        let session_id = self.adapter.connect()?;
        self.push()?;
        Ok(session_id)
    }

    pub fn disconnect(&mut self) {
        self.adapter.disconnect();
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// Address of the viewer
    pub fn url(&self) -> &str {
        self.adapter.endpoint().url()
    }

    pub fn status(&self) -> SyncStatus {
        self.adapter.status()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.adapter.session_id()
    }

    pub fn endpoint(&self) -> &E {
        self.adapter.endpoint()
    }

    // ========================================================================
    // Mutations (each pushes)
    // ========================================================================

    pub fn add_layer(&mut self, layer: Layer) -> Result<()> {
        self.scene.add_layer(layer);
        self.push()
    }

    pub fn add_layers(&mut self, layers: impl IntoIterator<Item = Layer>) -> Result<()> {
        self.scene.add_layers(layers);
        self.push()
    }

    /// Drop a layer locally and push. Lookup failures push nothing.
    pub fn drop_layer(&mut self, which: impl Into<LayerRef>) -> Result<Layer> {
        let dropped = self.scene.drop_layer(which)?;
        self.push()?;
        Ok(dropped)
    }

    /// Edit one layer in place, then push
    pub fn update_layer<T>(
        &mut self,
        which: impl Into<LayerRef>,
        edit: impl FnOnce(&mut Layer) -> T,
    ) -> Result<T> {
        let output = edit(self.scene.layer_mut(which)?);
        self.push()?;
        Ok(output)
    }

    pub fn set_setting(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.scene.set_setting(key, value)?;
        self.push()
    }

    pub fn remove_setting(&mut self, key: &str) -> Result<Option<Value>> {
        let removed = self.scene.remove_setting(key);
        if removed.is_some() {
            self.push()?;
        }
        Ok(removed)
    }

    /// Merge `other` into the live scene (see [`Scene::merge_with`])
    pub fn merge_with(&mut self, other: &Scene) -> Result<()> {
        self.scene = self.scene.merge_with(other);
        self.push()
    }

    /// Append `other`'s layers to the live scene (see [`Scene::combine`])
    pub fn combine_with(&mut self, other: &Scene) -> Result<()> {
        self.scene = self.scene.combine(other);
        self.push()
    }

    /// Apply several edits and push once at the end
    pub fn bundle<T>(&mut self, edit: impl FnOnce(&mut Scene) -> T) -> Result<T> {
        let output = edit(&mut self.scene);
        self.push()?;
        Ok(output)
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Push the full local document
    pub fn push(&mut self) -> Result<()> {
        let document = self.scene.to_value();
        self.adapter.push(&document)
    }

    /// Pull the viewer's document and adopt it if it changed.
    ///
    /// Returns whether the local scene was replaced. The base URL is kept.
    /// A document that does not decode leaves the local scene as it was and
    /// is retried by the next refresh.
    pub fn refresh(&mut self) -> Result<bool> {
        let base_url = self.scene.base_url().map(str::to_string);
        match self
            .adapter
            .pull_with(|document| json::from_value(document, base_url))?
        {
            Some(scene) => {
                self.scene = scene;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<E: ViewerEndpoint> Deref for LocalScene<E> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        &self.scene
    }
}

impl<E: ViewerEndpoint> fmt::Debug for LocalScene<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScene")
            .field("scene", &self.scene)
            .field("url", &self.url())
            .field("status", &self.status())
            .finish()
    }
}

impl<E: ViewerEndpoint> fmt::Display for LocalScene<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<LocalScene({})>", self.scene.summary())
    }
}
