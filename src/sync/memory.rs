//! In-memory viewer endpoint
//!
//! Stands in for a running viewer: holds one document, can be made
//! unreachable, and lets tests edit the document "from the viewer side".

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};

use super::ViewerEndpoint;
use crate::error::{Result, SceneError};

const MEMORY_URL: &str = "memory://viewer";

#[derive(Debug)]
pub struct MemoryViewerEndpoint {
    url: String,
    document: Mutex<Value>,
    reachable: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl MemoryViewerEndpoint {
    /// A reachable viewer showing an empty scene
    pub fn new() -> Self {
        Self::with_document(json!({ "layers": [] }))
    }

    pub fn with_document(document: Value) -> Self {
        Self {
            url: MEMORY_URL.to_string(),
            document: Mutex::new(document),
            reachable: AtomicBool::new(true),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Simulate the viewer going away or coming back
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Change the document as if a user edited it in the viewer
    pub fn remote_edit(&self, edit: impl FnOnce(&mut Value)) {
        edit(&mut self.lock());
    }

    /// Current document, without counting a call
    pub fn document(&self) -> Value {
        self.lock().clone()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SceneError::sync(format!("viewer at {} is not reachable", self.url)))
        }
    }
}

impl Default for MemoryViewerEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerEndpoint for MemoryViewerEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    fn get_state(&self) -> Result<Value> {
        self.check_reachable()?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.document())
    }

    fn set_state(&self, document: &Value) -> Result<()> {
        self.check_reachable()?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.lock() = document.clone();
        Ok(())
    }
}
