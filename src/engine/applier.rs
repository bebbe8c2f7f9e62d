use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{Capabilities, SettingUpdate};
use crate::ports::CaptureStream;

/// Result of pushing one field to the hardware.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The hardware accepted the value.
    Applied,
    /// The field is not exposed by the device; nothing was sent.
    NotSent,
    /// The hardware refused the value. The in-memory model keeps it anyway.
    AppliedWithWarning(String),
}

impl ApplyOutcome {
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, ApplyOutcome::AppliedWithWarning(_))
    }
}

/// Push a single-field update to a live stream.
///
/// Never fails: hardware rejections come back as a warning. Does not check
/// whether the field makes sense in the current focus mode.
pub async fn apply(
    stream: &dyn CaptureStream,
    capabilities: &Capabilities,
    update: &SettingUpdate,
) -> ApplyOutcome {
    let field = update.field();
    if !capabilities.supports(field) {
        debug!(field = %field, "Field not exposed by device, keeping value in memory only");
        return ApplyOutcome::NotSent;
    }

    match stream.apply_constraint(update).await {
        Ok(()) => {
            debug!(device_id = %stream.device_id(), ?update, "Constraint applied");
            ApplyOutcome::Applied
        }
        Err(e) => {
            warn!(
                device_id = %stream.device_id(),
                field = %field,
                error = %e,
                "Constraint rejected by hardware"
            );
            ApplyOutcome::AppliedWithWarning(e.to_string())
        }
    }
}
