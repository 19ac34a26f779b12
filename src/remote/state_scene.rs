//! State-backed scene
//!
//! Encodes to a short URL referencing a handle on a state service instead
//! of embedding the whole document. The document is uploaded lazily when
//! a URL is requested, and only again once it has changed.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::{debug, trace};

use super::StateService;
use crate::codec::url::{self as viewer_url, ViewerUrl};
use crate::codec::{fingerprint, json};
use crate::config::DEFAULT_BASE_URL;
use crate::error::{Result, SceneError};
use crate::scene::Scene;

/// A scene stored on a remote state service
pub struct StateScene<S: StateService> {
    scene: Scene,
    service: S,
    handle: Option<String>,
    /// Fingerprint of the document last written to `handle`
    uploaded: Option<String>,
}

impl<S: StateService> StateScene<S> {
    /// Wrap a local scene; nothing is uploaded until `to_url`
    pub fn new(service: S, scene: Scene) -> Self {
        Self {
            scene,
            service,
            handle: None,
            uploaded: None,
        }
    }

    /// Load the scene stored under `handle`
    pub fn from_handle(service: S, handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        let scene = json::from_value(service.fetch(&handle)?, None)?;
        let uploaded = Some(scene.fingerprint()?);
        debug!(handle = %handle, layers = scene.len(), "Loaded state scene");

        Ok(Self {
            scene,
            service,
            handle: Some(handle),
            uploaded,
        })
    }

    /// Load the scene a state URL points at, keeping its base URL
    pub fn from_url(service: S, url: &str) -> Result<Self> {
        match viewer_url::parse(url)? {
            ViewerUrl::State { base_url, handle } => {
                let mut state_scene = Self::from_handle(service, handle)?;
                state_scene.scene.set_base_url(Some(base_url));
                Ok(state_scene)
            }
            ViewerUrl::Embedded { .. } => Err(SceneError::decode(format!(
                "expected a state URL, got an embedded scene: {}",
                url
            ))),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Handle issued by the service, once the scene has been uploaded
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Upload if needed and return the short URL.
    ///
    /// The first call creates a handle. Later calls update the stored
    /// document only when it differs from what was last uploaded.
    pub fn to_url(&mut self) -> Result<String> {
        let document = self.scene.to_value();
        let current = fingerprint(&document)?;

        let handle = match self.handle.clone() {
            None => {
                let handle = self.service.create(&document)?;
                debug!(handle = %handle, "Created remote state");
                self.handle = Some(handle.clone());
                handle
            }
            Some(handle) if self.uploaded.as_deref() != Some(current.as_str()) => {
                self.service.update(&handle, &document)?;
                debug!(handle = %handle, "Updated remote state");
                handle
            }
            Some(handle) => {
                trace!(handle = %handle, "Remote state unchanged");
                handle
            }
        };
        self.uploaded = Some(current);

        let base_url = self.scene.base_url().unwrap_or(DEFAULT_BASE_URL);
        Ok(viewer_url::state_url(base_url, &handle))
    }
}

impl<S: StateService> Deref for StateScene<S> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        &self.scene
    }
}

impl<S: StateService> DerefMut for StateScene<S> {
    fn deref_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}

impl<S: StateService> fmt::Debug for StateScene<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateScene")
            .field("scene", &self.scene)
            .field("handle", &self.handle)
            .finish()
    }
}

impl<S: StateService> fmt::Display for StateScene<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<StateScene({})>", self.scene.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::remote::MemoryStateService;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handle_created_once() {
        let service = MemoryStateService::new();
        let mut scene = StateScene::new(&service, Scene::from_layers([Layer::image("a://img")]));
        assert_eq!(scene.handle(), None);

        let first = scene.to_url().unwrap();
        let second = scene.to_url().unwrap();
        assert_eq!(first, second);
        assert_eq!(service.create_count(), 1);
        assert_eq!(service.update_count(), 0);
        assert!(first.starts_with(DEFAULT_BASE_URL));
        assert!(first.contains("/state/"));
    }

    #[test]
    fn test_changes_update_same_handle() {
        let service = MemoryStateService::new();
        let mut scene = StateScene::new(&service, Scene::new());
        let first = scene.to_url().unwrap();

        scene.add_layer(Layer::mesh("a://meshes"));
        let second = scene.to_url().unwrap();

        assert_eq!(first, second);
        assert_eq!(service.update_count(), 1);
        let handle = scene.handle().unwrap().to_string();
        assert_eq!(service.document(&handle), Some(scene.to_value()));
    }

    #[test]
    fn test_from_url_round_trip() {
        let service = MemoryStateService::new();
        let mut original = StateScene::new(
            &service,
            Scene::from_layers([Layer::segmentation("a://seg").with_segments([7])])
                .with_base_url("https://ngl.example.org/"),
        );
        let url = original.to_url().unwrap();

        let loaded = StateScene::from_url(&service, &url).unwrap();
        assert_eq!(loaded.scene(), original.scene());
        assert_eq!(loaded.handle(), original.handle());
    }

    #[test]
    fn test_loaded_scene_not_reuploaded() {
        let service = MemoryStateService::new();
        service
            .insert("fixed", Scene::from_layers([Layer::image("a://img")]).to_value())
            .unwrap();

        let mut scene = StateScene::from_handle(&service, "fixed").unwrap();
        assert!(scene.to_url().unwrap().ends_with("/state/fixed"));
        assert_eq!(service.update_count(), 0);
        assert_eq!(service.create_count(), 0);
    }

    #[test]
    fn test_service_failure_surfaces() {
        let service = MemoryStateService::new();
        service.set_available(false);
        let mut scene = StateScene::new(&service, Scene::new());
        assert_eq!(
            scene.to_url().unwrap_err().error_code(),
            "REMOTE_SERVICE_ERROR"
        );
        assert_eq!(scene.handle(), None);
    }

    #[test]
    fn test_embedded_url_rejected() {
        let service = MemoryStateService::new();
        let url = Scene::new().to_url().unwrap();
        assert!(StateScene::from_url(&service, &url).is_err());
    }
}
