use std::fmt;

use serde::{Deserialize, Serialize};

use super::capture::SettingField;
use super::error::DomainError;

/// Capture stream state machine.
///
/// State transitions:
/// - any -> Opening (open; the held stream is released first)
/// - Opening -> Active (host accepted the open and it is still the latest request)
/// - Opening -> Failed (host rejected the open)
/// - any -> Idle (close)
///
/// A late result for a superseded open leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum StreamState {
    /// No stream held.
    Idle,
    /// An open is in flight.
    Opening { device_id: String },
    /// A live stream is bound to the device.
    Active { device_id: String },
    /// The last open attempt failed; retry by selecting a device again.
    Failed {
        device_id: String,
        reason: FailureReason,
    },
}

impl StreamState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, StreamState::Active { .. })
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, StreamState::Idle)
    }

    /// Device bound to the live stream, if any.
    pub fn active_device_id(&self) -> Option<&str> {
        match self {
            StreamState::Active { device_id } => Some(device_id),
            _ => None,
        }
    }

    /// Device targeted by the current or last attempt.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            StreamState::Idle => None,
            StreamState::Opening { device_id }
            | StreamState::Active { device_id }
            | StreamState::Failed { device_id, .. } => Some(device_id),
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => write!(f, "idle"),
            StreamState::Opening { device_id } => write!(f, "opening {}", device_id),
            StreamState::Active { device_id } => write!(f, "active {}", device_id),
            StreamState::Failed { device_id, reason } => {
                write!(f, "failed {} ({})", device_id, reason)
            }
        }
    }
}

/// Why an open attempt failed. Kept separate so the UI can offer the right fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    PermissionDenied,
    DeviceUnavailable(String),
}

impl From<&DomainError> for FailureReason {
    fn from(err: &DomainError) -> Self {
        match err {
            DomainError::PermissionDenied => FailureReason::PermissionDenied,
            DomainError::DeviceUnavailable { message, .. } => {
                FailureReason::DeviceUnavailable(message.clone())
            }
            other => FailureReason::DeviceUnavailable(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PermissionDenied => write!(f, "permission denied"),
            FailureReason::DeviceUnavailable(message) => write!(f, "unavailable: {}", message),
        }
    }
}

/// Events emitted by the capture session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// Stream state changed.
    StateChanged { from: StreamState, to: StreamState },
    /// The device list was refreshed.
    DevicesUpdated { count: usize },
    /// Settings were seeded from a freshly opened stream.
    SettingsReconciled { device_id: String },
    /// The hardware refused a single-field update.
    ConstraintWarning { field: SettingField, reason: String },
    /// A superseded open finished and its stream was released.
    StaleOpenDiscarded { device_id: String },
}
