//! Sync Adapter State Machine
//!
//! Disconnected -> Connected on a successful handshake. Every push or pull
//! passes through Syncing and returns to Connected, whether or not the
//! endpoint answered. Nothing is retried; failures surface as
//! `SceneError::Sync` and the caller decides what to do.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::ViewerEndpoint;
use crate::codec::fingerprint;
use crate::error::{Result, SceneError};

/// Connection state of a sync adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No session with the viewer (default state)
    #[default]
    Disconnected,
    /// Session established, idle
    Connected,
    /// A push or pull is in flight
    Syncing,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Disconnected => write!(f, "Disconnected"),
            SyncState::Connected => write!(f, "Connected"),
            SyncState::Syncing => write!(f, "Syncing"),
        }
    }
}

/// Snapshot of an adapter for display or logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub session_id: Option<Uuid>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Pushes and pulls whole scene documents to and from one viewer
#[derive(Debug)]
pub struct SyncAdapter<E: ViewerEndpoint> {
    endpoint: E,
    state: SyncState,
    /// Live session identifier, issued per connection
    session_id: Option<Uuid>,
    /// Fingerprint of the last document known to be on the viewer
    remote_fingerprint: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl<E: ViewerEndpoint> SyncAdapter<E> {
    /// Create a disconnected adapter
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            state: SyncState::Disconnected,
            session_id: None,
            remote_fingerprint: None,
            last_synced_at: None,
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SyncState::Disconnected
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state,
            session_id: self.session_id,
            last_synced_at: self.last_synced_at,
        }
    }

    /// Handshake with the viewer and open a session.
    ///
    /// Already connected adapters keep their session.
    pub fn connect(&mut self) -> Result<Uuid> {
        if let (true, Some(session_id)) = (self.is_connected(), self.session_id) {
            return Ok(session_id);
        }

        let document = self.endpoint.get_state().map_err(into_sync)?;
        let session_id = Uuid::new_v4();

        self.remote_fingerprint = Some(fingerprint(&document)?);
        self.session_id = Some(session_id);
        self.state = SyncState::Connected;
        self.last_synced_at = Some(Utc::now());

        debug!(session = %session_id, url = %self.endpoint.url(), "Connected to viewer");
        Ok(session_id)
    }

    /// Drop the session. The viewer process itself is left alone.
    pub fn disconnect(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            debug!(session = %session_id, "Disconnected from viewer");
        }
        self.state = SyncState::Disconnected;
        self.remote_fingerprint = None;
    }

    /// Send the full document to the viewer
    pub fn push(&mut self, document: &Value) -> Result<()> {
        self.require_connected("push")?;

        self.state = SyncState::Syncing;
        let result = self.endpoint.set_state(document);
        self.state = SyncState::Connected;
        result.map_err(into_sync)?;

        self.remote_fingerprint = Some(fingerprint(document)?);
        self.last_synced_at = Some(Utc::now());
        debug!(url = %self.endpoint.url(), "Pushed scene to viewer");
        Ok(())
    }

    /// Fetch the viewer's document.
    ///
    /// Returns `Some` only when it differs from what was last pushed or
    /// pulled. Pulling never pushes.
    pub fn pull(&mut self) -> Result<Option<Value>> {
        self.pull_with(Ok)
    }

    /// Fetch the viewer's document and convert it with `adopt`.
    ///
    /// The document only counts as seen once `adopt` succeeds, so a
    /// document that fails to convert is offered again on the next pull.
    pub fn pull_with<T>(
        &mut self,
        adopt: impl FnOnce(Value) -> Result<T>,
    ) -> Result<Option<T>> {
        self.require_connected("pull")?;

        self.state = SyncState::Syncing;
        let result = self.endpoint.get_state();
        self.state = SyncState::Connected;
        let document = result.map_err(into_sync)?;

        let current = fingerprint(&document)?;
        self.last_synced_at = Some(Utc::now());
        if self.remote_fingerprint.as_deref() == Some(current.as_str()) {
            trace!("Viewer state unchanged");
            return Ok(None);
        }

        let adopted = adopt(document)?;
        self.remote_fingerprint = Some(current);
        debug!(url = %self.endpoint.url(), "Pulled remote change from viewer");
        Ok(Some(adopted))
    }

    pub fn into_endpoint(self) -> E {
        self.endpoint
    }

    fn require_connected(&self, operation: &str) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SceneError::sync(format!(
                "cannot {}: not connected to a viewer",
                operation
            )))
        }
    }
}

fn into_sync(error: SceneError) -> SceneError {
    match error {
        SceneError::Sync { .. } => error,
        other => SceneError::sync(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MemoryViewerEndpoint;
    use serde_json::json;

    #[test]
    fn test_starts_disconnected() {
        let adapter = SyncAdapter::new(MemoryViewerEndpoint::new());
        assert_eq!(adapter.state(), SyncState::Disconnected);
        assert_eq!(adapter.status().session_id, None);
        assert_eq!(SyncState::default().to_string(), "Disconnected");
    }

    #[test]
    fn test_push_requires_connection() {
        let mut adapter = SyncAdapter::new(MemoryViewerEndpoint::new());
        let err = adapter.push(&json!({})).unwrap_err();
        assert_eq!(err.error_code(), "SYNC_ERROR");
        assert!(adapter.pull().is_err());
    }

    #[test]
    fn test_connect_issues_session() {
        let endpoint = MemoryViewerEndpoint::new();
        let mut adapter = SyncAdapter::new(&endpoint);
        let first = adapter.connect().unwrap();
        assert_eq!(adapter.connect().unwrap(), first);
        assert_eq!(adapter.state(), SyncState::Connected);

        adapter.disconnect();
        let second = adapter.connect().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_failed_handshake_stays_disconnected() {
        let endpoint = MemoryViewerEndpoint::new();
        endpoint.set_reachable(false);
        let mut adapter = SyncAdapter::new(&endpoint);
        assert!(adapter.connect().is_err());
        assert_eq!(adapter.state(), SyncState::Disconnected);
    }

    #[test]
    fn test_failed_push_returns_to_connected() {
        let endpoint = MemoryViewerEndpoint::new();
        let mut adapter = SyncAdapter::new(&endpoint);
        adapter.connect().unwrap();

        endpoint.set_reachable(false);
        let err = adapter.push(&json!({"layers": []})).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(adapter.state(), SyncState::Connected);

        endpoint.set_reachable(true);
        adapter.push(&json!({"layers": []})).unwrap();
        assert_eq!(endpoint.document(), json!({"layers": []}));
    }

    #[test]
    fn test_pull_reports_only_changes() {
        let endpoint = MemoryViewerEndpoint::new();
        let mut adapter = SyncAdapter::new(&endpoint);
        adapter.connect().unwrap();
        adapter.push(&json!({"layout": "xy"})).unwrap();
        assert_eq!(adapter.pull().unwrap(), None);

        endpoint.remote_edit(|state| state["layout"] = json!("3d"));
        assert_eq!(adapter.pull().unwrap(), Some(json!({"layout": "3d"})));
        assert_eq!(adapter.pull().unwrap(), None);
        assert_eq!(endpoint.set_count(), 1);
    }

    #[test]
    fn test_rejected_pull_is_offered_again() {
        let endpoint = MemoryViewerEndpoint::new();
        let mut adapter = SyncAdapter::new(&endpoint);
        adapter.connect().unwrap();
        adapter.push(&json!({"layout": "xy"})).unwrap();

        endpoint.remote_edit(|state| state["layout"] = json!("3d"));
        let err = adapter
            .pull_with(|_| Err::<(), _>(SceneError::decode("bad layer")))
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
        assert_eq!(adapter.state(), SyncState::Connected);

        assert_eq!(adapter.pull().unwrap(), Some(json!({"layout": "3d"})));
    }
}
