use tracing::{debug, warn};

use crate::domain::{Capabilities, CapabilityRange, DomainError, HardwareValues, SettingField};
use crate::ports::CaptureStream;

/// Read the parameter ranges advertised by a live stream.
///
/// Ranges with unusable bounds are treated as absent.
pub async fn read_capabilities(stream: &dyn CaptureStream) -> Result<Capabilities, DomainError> {
    ensure_live(stream)?;
    let raw = stream.capabilities().await?;

    let mut focus_modes = Vec::with_capacity(raw.focus_modes.len());
    for mode in raw.focus_modes {
        if !focus_modes.contains(&mode) {
            focus_modes.push(mode);
        }
    }

    let capabilities = Capabilities {
        focus_modes,
        focus_distance: sanitize(SettingField::FocusDistance, raw.focus_distance),
        zoom: sanitize(SettingField::Zoom, raw.zoom),
        brightness: sanitize(SettingField::Brightness, raw.brightness),
        contrast: sanitize(SettingField::Contrast, raw.contrast),
    };

    debug!(device_id = %stream.device_id(), ?capabilities, "Read capabilities");
    Ok(capabilities)
}

/// Read the values the hardware currently reports. Non-finite numbers are dropped.
pub async fn read_current_values(stream: &dyn CaptureStream) -> Result<HardwareValues, DomainError> {
    ensure_live(stream)?;
    let raw = stream.current_values().await?;

    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
    let values = HardwareValues {
        focus_mode: raw.focus_mode,
        focus_distance: finite(raw.focus_distance),
        zoom: finite(raw.zoom),
        brightness: finite(raw.brightness),
        contrast: finite(raw.contrast),
    };

    debug!(device_id = %stream.device_id(), ?values, "Read current values");
    Ok(values)
}

fn ensure_live(stream: &dyn CaptureStream) -> Result<(), DomainError> {
    if stream.is_live() {
        Ok(())
    } else {
        Err(DomainError::StreamNotActive)
    }
}

fn sanitize(field: SettingField, range: Option<CapabilityRange>) -> Option<CapabilityRange> {
    let range = range?;
    let valid = range.validated();
    if valid.is_none() {
        warn!(field = %field, ?range, "Ignoring unusable capability range");
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SimulatedCaptureHost, SimulatedDevice};
    use crate::domain::{FocusMode, ResolutionHint};
    use crate::ports::CaptureHost;

    #[tokio::test]
    async fn test_reads_advertised_subset() {
        let host = SimulatedCaptureHost::with_demo_devices();
        let stream = host
            .open_stream("sim-1", ResolutionHint::default())
            .await
            .unwrap();

        let caps = read_capabilities(stream.as_ref()).await.unwrap();
        assert!(caps.brightness.is_some());
        assert!(caps.zoom.is_none());
        assert!(caps.focus_modes.is_empty());

        let values = read_current_values(stream.as_ref()).await.unwrap();
        assert_eq!(values.brightness, Some(0.0));
        assert_eq!(values.zoom, None);
    }

    #[tokio::test]
    async fn test_drops_invalid_ranges_and_duplicate_modes() {
        let device = SimulatedDevice::plain("odd", "Odd Cam").with_capabilities(Capabilities {
            focus_modes: vec![FocusMode::Manual, FocusMode::Manual],
            zoom: Some(CapabilityRange {
                min: 5.0,
                max: 1.0,
                step: 1.0,
            }),
            brightness: Some(CapabilityRange {
                min: 0.0,
                max: 10.0,
                step: -1.0,
            }),
            ..Default::default()
        });
        let host = SimulatedCaptureHost::new(vec![device]);
        let stream = host
            .open_stream("odd", ResolutionHint::default())
            .await
            .unwrap();

        let caps = read_capabilities(stream.as_ref()).await.unwrap();
        assert_eq!(caps.focus_modes, vec![FocusMode::Manual]);
        assert!(caps.zoom.is_none());
        assert_eq!(caps.brightness.unwrap().step, 0.0);
    }

    #[tokio::test]
    async fn test_fails_fast_on_stopped_stream() {
        let host = SimulatedCaptureHost::with_demo_devices();
        let stream = host
            .open_stream("sim-0", ResolutionHint::default())
            .await
            .unwrap();
        stream.stop();

        assert_eq!(
            read_capabilities(stream.as_ref()).await.err(),
            Some(DomainError::StreamNotActive)
        );
        assert_eq!(
            read_current_values(stream.as_ref()).await.err(),
            Some(DomainError::StreamNotActive)
        );
    }
}
