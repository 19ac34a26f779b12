//! In-memory state service
//!
//! Keeps documents in a map and counts calls, so tests can check when the
//! network would have been hit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::StateService;
use crate::error::{Result, SceneError};

/// State service backed by a `HashMap`
#[derive(Debug)]
pub struct MemoryStateService {
    documents: Mutex<HashMap<String, Value>>,
    available: AtomicBool,
    creates: AtomicUsize,
    updates: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryStateService {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Simulate an outage; every call fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Store a document under a caller-chosen handle
    pub fn insert(&self, handle: impl Into<String>, document: Value) -> Result<()> {
        self.documents()?.insert(handle.into(), document);
        Ok(())
    }

    /// Current document stored under `handle`, without counting a fetch
    pub fn document(&self, handle: &str) -> Option<Value> {
        self.documents
            .lock()
            .ok()
            .and_then(|documents| documents.get(handle).cloned())
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SceneError::remote("state service unavailable"))
        }
    }

    fn documents(&self) -> Result<MutexGuard<'_, HashMap<String, Value>>> {
        self.documents
            .lock()
            .map_err(|_| SceneError::remote("state store lock poisoned"))
    }
}

impl Default for MemoryStateService {
    fn default() -> Self {
        Self::new()
    }
}

impl StateService for MemoryStateService {
    fn create(&self, document: &Value) -> Result<String> {
        self.check_available()?;
        let handle = Uuid::new_v4().simple().to_string();
        self.documents()?.insert(handle.clone(), document.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn fetch(&self, handle: &str) -> Result<Value> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents()?
            .get(handle)
            .cloned()
            .ok_or_else(|| SceneError::remote(format!("unknown state handle '{}'", handle)))
    }

    fn update(&self, handle: &str, document: &Value) -> Result<()> {
        self.check_available()?;
        let mut documents = self.documents()?;
        match documents.get_mut(handle) {
            Some(stored) => {
                *stored = document.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(SceneError::remote(format!(
                "unknown state handle '{}'",
                handle
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_fetch_update() {
        let service = MemoryStateService::new();
        let handle = service.create(&json!({"layers": []})).unwrap();
        assert_eq!(handle.len(), 32);
        assert_eq!(service.fetch(&handle).unwrap(), json!({"layers": []}));

        service.update(&handle, &json!({"layout": "3d"})).unwrap();
        assert_eq!(service.document(&handle), Some(json!({"layout": "3d"})));
        assert_eq!(service.create_count(), 1);
        assert_eq!(service.update_count(), 1);
        assert_eq!(service.fetch_count(), 1);
    }

    #[test]
    fn test_unknown_handle() {
        let service = MemoryStateService::new();
        let err = service.fetch("nope").unwrap_err();
        assert_eq!(err.error_code(), "REMOTE_SERVICE_ERROR");
        assert!(service.update("nope", &json!({})).is_err());
    }

    #[test]
    fn test_outage() {
        let service = MemoryStateService::new();
        service.set_available(false);
        let err = service.create(&json!({})).unwrap_err();
        assert!(err.is_retryable());
        service.set_available(true);
        assert!(service.create(&json!({})).is_ok());
    }
}
