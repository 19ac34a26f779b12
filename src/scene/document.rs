//! Scene Document
//!
//! An ordered list of layers plus the viewer's top-level settings.
//! Later layers render on top. Equality is structural.

use std::fmt;
use std::ops::{Add, BitOr};

use serde_json::{Map, Value};

use super::lookup::LayerRef;
use super::summary::SceneSummary;
use crate::error::{Result, SceneError};
use crate::layers::Layer;

/// A full viewer state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Viewer deployment URLs are generated against
    base_url: Option<String>,
    /// Ordered layers
    layers: Vec<Layer>,
    /// Top-level viewer settings (camera, layout, selectedLayer, ...)
    settings: Map<String, Value>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene holding `layers` in order
    pub fn from_layers(layers: impl IntoIterator<Item = Layer>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(
        base_url: Option<String>,
        layers: Vec<Layer>,
        settings: Map<String, Value>,
    ) -> Self {
        Self {
            base_url,
            layers,
            settings,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn set_base_url(&mut self, base_url: Option<String>) {
        self.base_url = base_url;
    }

    // ========================================================================
    // Layers
    // ========================================================================

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Append a layer. Duplicates are allowed.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Append layers in order
    pub fn add_layers(&mut self, layers: impl IntoIterator<Item = Layer>) {
        self.layers.extend(layers);
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.add_layer(layer);
        self
    }

    /// Position of the layer `which` refers to
    pub fn position(&self, which: impl Into<LayerRef>) -> Result<usize> {
        let which = which.into();
        which
            .resolve(self.layers.len(), self.layers.iter().map(Layer::name))
            .ok_or_else(|| SceneError::LayerNotFound {
                which: which.to_string(),
            })
    }

    /// Look up a layer by index or by (first matching) name
    pub fn layer(&self, which: impl Into<LayerRef>) -> Result<&Layer> {
        let index = self.position(which)?;
        Ok(&self.layers[index])
    }

    pub fn layer_mut(&mut self, which: impl Into<LayerRef>) -> Result<&mut Layer> {
        let index = self.position(which)?;
        Ok(&mut self.layers[index])
    }

    /// Remove a layer by index or name and return it
    pub fn drop_layer(&mut self, which: impl Into<LayerRef>) -> Result<Layer> {
        let index = self.position(which)?;
        Ok(self.layers.remove(index))
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Set a top-level setting. `layers` is managed through the layer API.
    pub fn set_setting(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if key == "layers" {
            return Err(SceneError::LayerError {
                reason: "use add_layers/drop_layer to edit the layers".to_string(),
            });
        }
        self.settings.insert(key, value.into());
        Ok(())
    }

    pub fn remove_setting(&mut self, key: &str) -> Option<Value> {
        self.settings.remove(key)
    }

    // ========================================================================
    // Combination
    // ========================================================================

    /// Concatenate layers: ours first, then `other`'s.
    ///
    /// Settings and base URL come from `self`.
    pub fn combine(&self, other: &Scene) -> Scene {
        let mut combined = self.clone();
        combined.layers.extend(other.layers.iter().cloned());
        combined
    }

    /// Merge `other` into a copy of this scene.
    ///
    /// Each of `other`'s layers is merged into the first equivalent layer
    /// among our original layers (see [`Layer::merge`]), or appended when
    /// there is none. Settings and base URL come from `self`.
    pub fn merge_with(&self, other: &Scene) -> Scene {
        let mut merged = self.clone();
        let original_len = merged.layers.len();

        for layer in &other.layers {
            match merged.layers[..original_len]
                .iter_mut()
                .find(|existing| existing.is_equivalent(layer))
            {
                Some(existing) => existing.absorb(layer),
                None => merged.layers.push(layer.clone()),
            }
        }

        merged
    }

    /// Layer counts per kind
    pub fn summary(&self) -> SceneSummary {
        SceneSummary::count(&self.layers)
    }
}

impl<'a> IntoIterator for &'a Scene {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

impl Add for &Scene {
    type Output = Scene;

    fn add(self, other: &Scene) -> Scene {
        self.combine(other)
    }
}

impl BitOr for &Scene {
    type Output = Scene;

    fn bitor(self, other: &Scene) -> Scene {
        self.merge_with(other)
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Scene({})>", self.summary())
    }
}
