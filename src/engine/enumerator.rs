use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Device, DeviceInfo, DeviceKind, DomainError};
use crate::ports::CaptureHost;

/// Lists the video capture devices the user can pick from.
///
/// Never touches the active stream, so a refresh is safe at any time.
pub struct DeviceEnumerator {
    host: Arc<dyn CaptureHost>,
}

impl DeviceEnumerator {
    pub fn new(host: Arc<dyn CaptureHost>) -> Self {
        Self { host }
    }

    /// Obtain permission, then list video inputs in host order.
    pub async fn list_devices(&self) -> Result<Vec<Device>, DomainError> {
        if let Err(e) = self.host.request_permission().await {
            warn!(error = %e, "Capture permission not granted");
            return Err(e);
        }

        let inventory = self.host.enumerate_devices().await?;
        let total = inventory.len();
        let devices = normalize(inventory);

        info!(total, video = devices.len(), "Enumerated capture devices");
        Ok(devices)
    }
}

/// Keep video inputs, trim ids, drop blank or duplicate ids and fill in
/// missing labels with "Camera N" (N counts video inputs from 1).
fn normalize(inventory: Vec<DeviceInfo>) -> Vec<Device> {
    let mut seen = HashSet::new();
    let mut devices = Vec::new();

    for (index, info) in inventory
        .into_iter()
        .filter(|info| info.kind == DeviceKind::VideoInput)
        .enumerate()
    {
        let id = info.id.trim().to_string();
        if id.is_empty() || !seen.insert(id.clone()) {
            debug!(id = %info.id, "Skipping device with blank or duplicate id");
            continue;
        }

        let label = match info.label.trim() {
            "" => format!("Camera {}", index + 1),
            label => label.to_string(),
        };

        devices.push(Device { id, label });
    }

    devices
}
