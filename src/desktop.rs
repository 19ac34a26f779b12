//! Desktop integration
//!
//! Clipboard and browser access sit behind the `Desktop` trait so scenes can
//! be copied, pasted and opened without touching the real OS in tests.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::codec;
use crate::error::{Result, SceneError};
use crate::scene::Scene;

/// Clipboard and browser capabilities supplied by the host
pub trait Desktop {
    fn read_clipboard(&self) -> Result<String>;

    fn write_clipboard(&self, text: &str) -> Result<()>;

    fn open_url(&self, url: &str) -> Result<()>;
}

impl<T: Desktop + ?Sized> Desktop for &T {
    fn read_clipboard(&self) -> Result<String> {
        (**self).read_clipboard()
    }

    fn write_clipboard(&self, text: &str) -> Result<()> {
        (**self).write_clipboard(text)
    }

    fn open_url(&self, url: &str) -> Result<()> {
        (**self).open_url(url)
    }
}

/// What `Scene::to_clipboard` copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipboardContent {
    /// The full viewer URL
    #[default]
    Url,
    /// The pretty-printed JSON document only
    Json,
}

/// Desktop double that keeps a clipboard in memory and records opened URLs
#[derive(Debug, Default)]
pub struct RecordingDesktop {
    clipboard: Mutex<Option<String>>,
    opened: Mutex<Vec<String>>,
}

impl RecordingDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clipboard(text: impl Into<String>) -> Self {
        Self {
            clipboard: Mutex::new(Some(text.into())),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn clipboard(&self) -> Option<String> {
        lock(&self.clipboard).clone()
    }

    /// URLs passed to `open_url`, oldest first
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Desktop for RecordingDesktop {
    fn read_clipboard(&self) -> Result<String> {
        lock(&self.clipboard).clone().ok_or_else(|| SceneError::Desktop {
            reason: "clipboard is empty".to_string(),
        })
    }

    fn write_clipboard(&self, text: &str) -> Result<()> {
        *lock(&self.clipboard) = Some(text.to_string());
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<()> {
        lock(&self.opened).push(url.to_string());
        Ok(())
    }
}

impl Scene {
    /// Decode whatever URL or JSON is on the clipboard
    pub fn from_clipboard(desktop: &impl Desktop) -> Result<Scene> {
        let text = desktop.read_clipboard()?;
        codec::decode(text)
    }

    /// Copy the scene's URL or JSON to the clipboard
    pub fn to_clipboard(&self, desktop: &impl Desktop, content: ClipboardContent) -> Result<()> {
        let text = match content {
            ClipboardContent::Url => self.to_url()?,
            ClipboardContent::Json => self.to_json(true)?,
        };
        desktop.write_clipboard(&text)?;
        debug!(content = ?content, "Scene copied to clipboard");
        Ok(())
    }

    /// Open the scene's URL in a browser
    pub fn open(&self, desktop: &impl Desktop) -> Result<()> {
        desktop.open_url(&self.to_url()?)
    }
}
