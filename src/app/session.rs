use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::{
    Capabilities, Device, DomainError, ResolutionHint, SessionEvent, SettingUpdate, SettingsModel,
    StreamState,
};
use crate::engine::{
    apply, read_capabilities, read_current_values, reconcile, ApplyOutcome, DeviceEnumerator,
    StreamLifecycle,
};
use crate::ports::CaptureHost;

/// Session context holding everything the control panel shows.
///
/// Owns the device list, the stream lifecycle, the capabilities of the open
/// stream and the settings model. Settings are only replaced wholesale by
/// reconciliation after an open, or one field at a time by user edits.
pub struct CaptureSession {
    enumerator: DeviceEnumerator,
    lifecycle: StreamLifecycle,
    devices: RwLock<Vec<Device>>,
    capabilities: RwLock<Capabilities>,
    settings: RwLock<SettingsModel>,
    events: broadcast::Sender<SessionEvent>,
}

impl CaptureSession {
    pub fn new(host: Arc<dyn CaptureHost>, hint: ResolutionHint) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            enumerator: DeviceEnumerator::new(Arc::clone(&host)),
            lifecycle: StreamLifecycle::new(host, hint, events.clone()),
            devices: RwLock::new(Vec::new()),
            capabilities: RwLock::new(Capabilities::default()),
            settings: RwLock::new(SettingsModel::default()),
            events,
        }
    }

    /// Re-enumerate devices. Leaves any open stream alone.
    ///
    /// On permission refusal the list is emptied and the error returned.
    pub async fn refresh_devices(&self) -> Result<Vec<Device>, DomainError> {
        match self.enumerator.list_devices().await {
            Ok(devices) => {
                *self.devices.write() = devices.clone();
                let _ = self.events.send(SessionEvent::DevicesUpdated {
                    count: devices.len(),
                });
                Ok(devices)
            }
            Err(e) => {
                self.devices.write().clear();
                let _ = self.events.send(SessionEvent::DevicesUpdated { count: 0 });
                Err(e)
            }
        }
    }

    /// Open `device_id`, read its capabilities and seed the settings model.
    ///
    /// Returns [`DomainError::StaleOpen`] when a newer selection took over
    /// while this one was in flight; nothing is written in that case.
    pub async fn select_device(&self, device_id: &str) -> Result<SettingsModel, DomainError> {
        *self.capabilities.write() = Capabilities::default();

        let active = self.lifecycle.open(device_id).await?;
        let introspected = async {
            let capabilities = read_capabilities(active.stream.as_ref()).await?;
            let hardware = read_current_values(active.stream.as_ref()).await?;
            Ok::<_, DomainError>((capabilities, hardware))
        }
        .await;

        if !self.lifecycle.is_current(active.request) {
            return Err(DomainError::StaleOpen {
                device_id: device_id.to_string(),
            });
        }
        let (capabilities, hardware) = match introspected {
            Ok(found) => found,
            Err(e) => {
                self.lifecycle.fail(&active, &e);
                return Err(e);
            }
        };

        let reconciled = {
            let mut settings = self.settings.write();
            let reconciled = reconcile(&settings, &capabilities, &hardware);
            *settings = reconciled.clone();
            reconciled
        };
        *self.capabilities.write() = capabilities;

        let _ = self.events.send(SessionEvent::SettingsReconciled {
            device_id: device_id.to_string(),
        });
        info!(device_id = %device_id, settings = ?reconciled, "Settings reconciled");
        Ok(reconciled)
    }

    /// Change one field and mirror it to the hardware.
    ///
    /// The value is clamped into the advertised range and stored before the
    /// hardware answers; a rejection leaves it in place and comes back as a
    /// warning. Without an open stream the change stays in memory.
    pub async fn update_setting(&self, update: SettingUpdate) -> ApplyOutcome {
        let capabilities = self.capabilities.read().clone();
        let update = update.clamped(&capabilities);
        self.settings.write().apply(&update);

        let stream = match self.lifecycle.active_stream() {
            Ok(stream) => stream,
            Err(_) => return ApplyOutcome::NotSent,
        };

        let outcome = apply(stream.as_ref(), &capabilities, &update).await;
        if let ApplyOutcome::AppliedWithWarning(reason) = &outcome {
            warn!(field = %update.field(), reason = %reason, "Keeping requested value despite rejection");
            let _ = self.events.send(SessionEvent::ConstraintWarning {
                field: update.field(),
                reason: reason.clone(),
            });
        }
        outcome
    }

    /// Release the stream. Idempotent.
    pub fn close(&self) {
        self.lifecycle.close();
        *self.capabilities.write() = Capabilities::default();
    }

    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    pub fn settings(&self) -> SettingsModel {
        self.settings.read().clone()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities.read().clone()
    }

    pub fn stream_state(&self) -> StreamState {
        self.lifecycle.state()
    }

    /// Label of the device bound to the live stream.
    pub fn active_device_label(&self) -> Option<String> {
        let state = self.lifecycle.state();
        let id = state.active_device_id()?;
        let label = self
            .devices
            .read()
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.label.clone())
            .unwrap_or_else(|| id.to_string());
        Some(label)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SimulatedCaptureHost, SimulatedDevice};
    use crate::domain::{CapabilityRange, HardwareValues, SettingField};

    fn scenario_host() -> SimulatedCaptureHost {
        let cam_a = SimulatedDevice::plain("a", "Cam A")
            .with_capabilities(Capabilities {
                zoom: CapabilityRange::new(1.0, 5.0, 0.1),
                brightness: CapabilityRange::new(0.0, 255.0, 1.0),
                ..Default::default()
            })
            .with_values(HardwareValues {
                zoom: Some(1.0),
                brightness: Some(100.0),
                ..Default::default()
            });
        let cam_b = SimulatedDevice::plain("b", "Cam B").with_capabilities(Capabilities {
            zoom: CapabilityRange::new(1.0, 2.0, 0.5),
            ..Default::default()
        });
        SimulatedCaptureHost::new(vec![cam_a, cam_b])
    }

    fn session(host: &SimulatedCaptureHost) -> Arc<CaptureSession> {
        Arc::new(CaptureSession::new(
            Arc::new(host.clone()),
            ResolutionHint::default(),
        ))
    }

    #[tokio::test]
    async fn test_zoom_scenario() {
        let host = scenario_host();
        let session = session(&host);

        let devices = session.refresh_devices().await.unwrap();
        assert_eq!(devices[0].label, "Cam A");

        let seeded = session.select_device("a").await.unwrap();
        assert_eq!(seeded.zoom, 1.0);

        let outcome = session.update_setting(SettingUpdate::Zoom(3.0)).await;
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(session.settings().zoom, 3.0);
        assert_eq!(
            host.applied_constraints(),
            vec![("a".to_string(), SettingUpdate::Zoom(3.0))]
        );
    }

    #[tokio::test]
    async fn test_contrast_without_range_keeps_default() {
        let host = scenario_host();
        let session = session(&host);

        let seeded = session.select_device("a").await.unwrap();
        assert_eq!(seeded.contrast, SettingsModel::default().contrast);
        assert!(session.capabilities().contrast.is_none());

        let outcome = session.update_setting(SettingUpdate::Contrast(50.0)).await;
        assert_eq!(outcome, ApplyOutcome::NotSent);
        assert_eq!(session.settings().contrast, 50.0);
        assert!(host.applied_constraints().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_constraint_keeps_requested_value() {
        let host = scenario_host();
        host.reject_field(SettingField::Brightness);
        let session = session(&host);
        session.select_device("a").await.unwrap();
        let mut events = session.subscribe();

        let outcome = session.update_setting(SettingUpdate::Brightness(200.0)).await;
        assert!(outcome.is_warning());
        assert_eq!(session.settings().brightness, 200.0);
        assert!(session.stream_state().is_active());
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::ConstraintWarning {
                field: SettingField::Brightness,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_user_edit_clamped_to_range() {
        let host = scenario_host();
        let session = session(&host);
        session.select_device("a").await.unwrap();

        session.update_setting(SettingUpdate::Zoom(12.0)).await;
        assert_eq!(session.settings().zoom, 5.0);
        assert!(session.settings().within(&session.capabilities()));
    }

    #[tokio::test]
    async fn test_successive_edits_apply_to_freshest_model() {
        let host = scenario_host();
        let session = session(&host);
        session.select_device("a").await.unwrap();

        let (a, b) = tokio::join!(
            session.update_setting(SettingUpdate::Zoom(2.0)),
            session.update_setting(SettingUpdate::Brightness(10.0)),
        );
        assert_eq!(a, ApplyOutcome::Applied);
        assert_eq!(b, ApplyOutcome::Applied);

        let settings = session.settings();
        assert_eq!(settings.zoom, 2.0);
        assert_eq!(settings.brightness, 10.0);
    }

    #[tokio::test]
    async fn test_rapid_switch_keeps_newest_device_settings() {
        let host = scenario_host();
        let gate = host.hold_open("a");
        let session = session(&host);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.select_device("a").await })
        };
        while host.open_requests("a") == 0 {
            tokio::task::yield_now().await;
        }

        let seeded_b = session.select_device("b").await.unwrap();
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(DomainError::StaleOpen { .. })
        ));
        assert_eq!(session.stream_state().active_device_id(), Some("b"));
        assert_eq!(session.settings(), seeded_b);
        assert_eq!(session.capabilities().zoom, CapabilityRange::new(1.0, 2.0, 0.5));
        assert_eq!(host.live_streams(), 1);
    }

    #[tokio::test]
    async fn test_switch_during_introspection_reports_stale() {
        let host = scenario_host();
        let gate = host.hold_introspection("a");
        let session = session(&host);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.select_device("a").await })
        };
        while session.stream_state().active_device_id() != Some("a") {
            tokio::task::yield_now().await;
        }

        session.select_device("b").await.unwrap();
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(DomainError::StaleOpen { .. })
        ));
        assert_eq!(session.stream_state().active_device_id(), Some("b"));
        assert_eq!(host.live_streams(), 1);
    }

    #[tokio::test]
    async fn test_failed_introspection_fails_stream() {
        let host = scenario_host();
        host.break_introspection("a");
        let session = session(&host);

        let err = session.select_device("a").await.unwrap_err();
        assert!(matches!(err, DomainError::DeviceUnavailable { .. }));
        assert!(matches!(
            session.stream_state(),
            StreamState::Failed { ref device_id, .. } if device_id == "a"
        ));
        assert_eq!(host.live_streams(), 0);
        assert_eq!(session.settings(), SettingsModel::default());
    }

    #[tokio::test]
    async fn test_refresh_does_not_disturb_stream() {
        let host = scenario_host();
        let session = session(&host);
        session.select_device("a").await.unwrap();

        session.refresh_devices().await.unwrap();
        assert!(session.stream_state().is_active());
        assert_eq!(host.live_streams(), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_empties_device_list() {
        let host = scenario_host();
        let session = session(&host);
        session.refresh_devices().await.unwrap();

        host.set_permission_denied(true);
        let err = session.refresh_devices().await.unwrap_err();
        assert!(err.is_permission_denied());
        assert!(session.devices().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_stream_stays_in_memory() {
        let host = scenario_host();
        let session = session(&host);

        let outcome = session.update_setting(SettingUpdate::Zoom(4.0)).await;
        assert_eq!(outcome, ApplyOutcome::NotSent);
        assert_eq!(session.settings().zoom, 4.0);
    }

    #[tokio::test]
    async fn test_close_releases_hardware() {
        let host = scenario_host();
        let session = session(&host);
        session.select_device("a").await.unwrap();

        session.close();
        session.close();
        assert!(session.stream_state().is_idle());
        assert_eq!(host.live_streams(), 0);
        assert_eq!(session.active_device_label(), None);
    }
}
