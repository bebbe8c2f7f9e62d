use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Capabilities, DeviceInfo, DomainError, HardwareValues, ResolutionHint, SettingUpdate};

/// Shared handle to a live capture stream.
///
/// Only the stream lifecycle manager creates and stops these; everything else
/// borrows one for the duration of a call.
pub type StreamHandle = Arc<dyn CaptureStream>;

/// Port for the host's capture API.
///
/// Implementations wrap a platform camera stack (V4L2, a simulated host, ...).
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Ask for capture permission.
    ///
    /// May open and immediately close a transient stream when the platform
    /// requires it to reveal device labels. Returns
    /// [`DomainError::PermissionDenied`] when refused.
    async fn request_permission(&self) -> Result<(), DomainError>;

    /// Full media device inventory, including non-video entries.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DomainError>;

    /// Open a capture stream bound to `device_id`.
    ///
    /// Fails with [`DomainError::DeviceUnavailable`] when the device is busy,
    /// removed or the driver refuses, and with [`DomainError::PermissionDenied`]
    /// when access was revoked.
    async fn open_stream(
        &self,
        device_id: &str,
        hint: ResolutionHint,
    ) -> Result<StreamHandle, DomainError>;
}

/// A live connection to one capture device.
#[async_trait]
pub trait CaptureStream: Send + Sync {
    /// Device this stream is bound to.
    fn device_id(&self) -> &str;

    /// Whether the underlying tracks are still running.
    fn is_live(&self) -> bool;

    /// Supported parameter ranges.
    async fn capabilities(&self) -> Result<Capabilities, DomainError>;

    /// Current parameter values.
    async fn current_values(&self) -> Result<HardwareValues, DomainError>;

    /// Apply a single-field constraint to the running stream.
    async fn apply_constraint(&self, update: &SettingUpdate) -> Result<(), DomainError>;

    /// Stop every underlying track. Must be idempotent.
    fn stop(&self);
}
