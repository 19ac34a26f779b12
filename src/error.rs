//! Error handling for ngscenes
//!
//! Every fallible operation returns [`SceneError`]. Nothing is retried
//! internally; retryable failures are flagged so callers can decide.

use thiserror::Error;

/// Result type alias for ngscenes operations
pub type Result<T> = std::result::Result<T, SceneError>;

/// Main error type for scene operations
#[derive(Error, Debug)]
pub enum SceneError {
    // Codec Errors
    #[error("Unable to decode scene: {reason}")]
    Decode { reason: String },

    // Lookup Errors
    #[error("No layer matching {which}")]
    LayerNotFound { which: String },

    // Layer Errors
    #[error("Unable to merge {left} with {right}: layers are not equivalent")]
    IncompatibleLayer { left: String, right: String },

    #[error("Layer operation failed: {reason}")]
    LayerError { reason: String },

    #[error("Segment property error: {reason}")]
    PropertyError { reason: String },

    // Collaborator Errors
    #[error("Viewer sync failed: {reason}")]
    Sync { reason: String },

    #[error("State service error: {reason}")]
    RemoteService { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Desktop integration failed: {reason}")]
    Desktop { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SceneError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        SceneError::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn sync(reason: impl Into<String>) -> Self {
        SceneError::Sync {
            reason: reason.into(),
        }
    }

    pub(crate) fn remote(reason: impl Into<String>) -> Self {
        SceneError::RemoteService {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SceneError::Decode { .. } => "DECODE_ERROR",
            SceneError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            SceneError::IncompatibleLayer { .. } => "INCOMPATIBLE_LAYER",
            SceneError::LayerError { .. } => "LAYER_ERROR",
            SceneError::PropertyError { .. } => "PROPERTY_ERROR",
            SceneError::Sync { .. } => "SYNC_ERROR",
            SceneError::RemoteService { .. } => "REMOTE_SERVICE_ERROR",
            SceneError::Config { .. } => "CONFIG_ERROR",
            SceneError::Desktop { .. } => "DESKTOP_ERROR",
            SceneError::Io(_) => "IO_ERROR",
            SceneError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if the failed call may succeed when repeated.
    ///
    /// Only network-facing errors qualify; the library itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SceneError::Sync { .. } | SceneError::RemoteService { .. }
        )
    }

    /// Returns a short recovery hint for the error, if one exists.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SceneError::Decode { .. } => {
                Some("Pass a viewer URL with a '#!' fragment, a state URL, or a JSON object.")
            }
            SceneError::LayerNotFound { .. } => {
                Some("Check the layer name or index against scene.layers().")
            }
            SceneError::IncompatibleLayer { .. } => {
                Some("Only layers of the same type and source can be merged.")
            }
            SceneError::Sync { .. } => Some("Make sure the local viewer is running, then push again."),
            SceneError::RemoteService { .. } => {
                Some("Check the state server URL and credentials, then retry.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SceneError::LayerNotFound {
            which: "name 'synapses'".to_string(),
        };
        assert_eq!(err.error_code(), "LAYER_NOT_FOUND");
        assert_eq!(err.to_string(), "No layer matching name 'synapses'");
    }

    #[test]
    fn test_retryable() {
        assert!(SceneError::sync("connection refused").is_retryable());
        assert!(SceneError::remote("502").is_retryable());
        assert!(!SceneError::decode("bad json").is_retryable());
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = SceneError::IncompatibleLayer {
            left: "image".to_string(),
            right: "mesh".to_string(),
        };
        assert!(err.recovery_suggestion().is_some());
        assert!(SceneError::Config {
            reason: "x".to_string()
        }
        .recovery_suggestion()
        .is_none());
    }
}
