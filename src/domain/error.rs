use thiserror::Error;

use crate::domain::capture::SettingField;

/// Domain-level errors for CamTune.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Network request blocked: {reason}")]
    NetworkBlocked { reason: String },

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Camera permission denied. Grant camera access and refresh the device list.")]
    PermissionDenied,

    #[error("Camera '{device_id}' is unavailable: {message}")]
    DeviceUnavailable { device_id: String, message: String },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A stream-bound operation was attempted without an active stream.
    #[error("No active capture stream")]
    StreamNotActive,

    /// A newer open request superseded this one; its result was discarded.
    #[error("Open of '{device_id}' was superseded by a newer selection")]
    StaleOpen { device_id: String },

    #[error("Hardware rejected {field}: {reason}")]
    ConstraintRejected { field: SettingField, reason: String },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl DomainError {
    /// Whether this error means the user has to grant capture permission.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, DomainError::PermissionDenied)
    }
}

/// Failures of the script-generation collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The service credential is absent. The message tells the user how to fix it.
    #[error("{0}")]
    MissingCredential(String),

    #[error("Script generation failed: {0}")]
    Service(String),

    #[error("A script is already being generated")]
    InProgress,
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_distinct_from_unavailable() {
        let denied = DomainError::PermissionDenied;
        let busy = DomainError::DeviceUnavailable {
            device_id: "cam-a".to_string(),
            message: "Device or resource busy".to_string(),
        };

        assert!(denied.is_permission_denied());
        assert!(!busy.is_permission_denied());
        assert_ne!(denied.to_string(), busy.to_string());
    }

    #[test]
    fn test_missing_credential_message_is_verbatim() {
        let err = DomainError::from(ScriptError::MissingCredential(
            "Set GEMINI_API_KEY to enable script generation".to_string(),
        ));
        assert_eq!(err.to_string(), "Set GEMINI_API_KEY to enable script generation");

        let generic = DomainError::from(ScriptError::Service("HTTP 500".to_string()));
        assert!(generic.to_string().starts_with("Script generation failed"));
    }
}
