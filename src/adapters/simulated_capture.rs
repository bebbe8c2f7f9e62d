use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::domain::{
    Capabilities, CapabilityRange, DeviceInfo, DeviceKind, DomainError, FocusMode, HardwareValues,
    ResolutionHint, SettingField, SettingUpdate,
};
use crate::ports::{CaptureHost, CaptureStream, StreamHandle};

/// A camera known to the simulated host.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub info: DeviceInfo,
    pub capabilities: Capabilities,
    pub values: HardwareValues,
}

impl SimulatedDevice {
    /// A video device exposing nothing tunable.
    pub fn plain(id: &str, label: &str) -> Self {
        Self {
            info: DeviceInfo::video(id, label),
            capabilities: Capabilities::default(),
            values: HardwareValues::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_values(mut self, values: HardwareValues) -> Self {
        self.values = values;
        self
    }
}

#[derive(Default)]
struct HostState {
    permission_denied: AtomicBool,
    devices: RwLock<Vec<SimulatedDevice>>,
    busy: RwLock<HashSet<String>>,
    rejected: RwLock<HashSet<SettingField>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    introspection_gates: Mutex<HashMap<String, Arc<Notify>>>,
    broken_introspection: RwLock<HashSet<String>>,
    open_requests: Mutex<Vec<String>>,
    applied: Mutex<Vec<(String, SettingUpdate)>>,
    live_streams: AtomicUsize,
}

/// In-process capture host.
///
/// Serves the demo backend and doubles as the injected host in tests: devices,
/// permission refusal, busy devices and per-field rejections are all scriptable,
/// and an open can be held in flight until released.
#[derive(Clone, Default)]
pub struct SimulatedCaptureHost {
    state: Arc<HostState>,
}

impl SimulatedCaptureHost {
    pub fn new(devices: Vec<SimulatedDevice>) -> Self {
        let host = Self::default();
        *host.state.devices.write() = devices;
        host
    }

    /// Two demo webcams plus a microphone entry that enumeration must filter out.
    pub fn with_demo_devices() -> Self {
        let studio = SimulatedDevice::plain("sim-0", "Simulated Studio Camera")
            .with_capabilities(Capabilities {
                focus_modes: vec![FocusMode::Continuous, FocusMode::Manual],
                focus_distance: CapabilityRange::new(0.0, 250.0, 5.0),
                zoom: CapabilityRange::new(100.0, 500.0, 10.0),
                brightness: CapabilityRange::new(0.0, 255.0, 1.0),
                contrast: CapabilityRange::new(0.0, 255.0, 1.0),
            })
            .with_values(HardwareValues {
                focus_mode: Some(FocusMode::Continuous),
                focus_distance: Some(0.0),
                zoom: Some(100.0),
                brightness: Some(128.0),
                contrast: Some(128.0),
            });

        let laptop = SimulatedDevice::plain("sim-1", "")
            .with_capabilities(Capabilities {
                brightness: CapabilityRange::new(-64.0, 64.0, 1.0),
                contrast: CapabilityRange::new(0.0, 95.0, 1.0),
                ..Default::default()
            })
            .with_values(HardwareValues {
                brightness: Some(0.0),
                ..Default::default()
            });

        let host = Self::new(vec![studio, laptop]);
        host.add_inventory_entry(DeviceInfo {
            id: "sim-mic".to_string(),
            label: "Simulated Microphone".to_string(),
            kind: DeviceKind::AudioInput,
        });
        host
    }

    /// Add a raw inventory entry of any kind.
    pub fn add_inventory_entry(&self, info: DeviceInfo) {
        self.state.devices.write().push(SimulatedDevice {
            info,
            capabilities: Capabilities::default(),
            values: HardwareValues::default(),
        });
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.state.permission_denied.store(denied, Ordering::SeqCst);
    }

    /// Mark a device as held by another process.
    pub fn set_busy(&self, device_id: &str, busy: bool) {
        let mut set = self.state.busy.write();
        if busy {
            set.insert(device_id.to_string());
        } else {
            set.remove(device_id);
        }
    }

    /// Make every stream refuse updates to `field`.
    pub fn reject_field(&self, field: SettingField) {
        self.state.rejected.write().insert(field);
    }

    /// Hold opens of `device_id` until the returned gate is notified.
    pub fn hold_open(&self, device_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .gates
            .lock()
            .insert(device_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Hold capability reads on streams of `device_id` until the returned gate is notified.
    pub fn hold_introspection(&self, device_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .introspection_gates
            .lock()
            .insert(device_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Make capability reads on streams of `device_id` fail.
    pub fn break_introspection(&self, device_id: &str) {
        self.state
            .broken_introspection
            .write()
            .insert(device_id.to_string());
    }

    /// Number of open requests received for `device_id`.
    pub fn open_requests(&self, device_id: &str) -> usize {
        self.state
            .open_requests
            .lock()
            .iter()
            .filter(|id| id.as_str() == device_id)
            .count()
    }

    /// Constraints accepted by the hardware, in order.
    pub fn applied_constraints(&self) -> Vec<(String, SettingUpdate)> {
        self.state.applied.lock().clone()
    }

    /// Streams opened and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.state.live_streams.load(Ordering::SeqCst)
    }

    fn find(&self, device_id: &str) -> Option<SimulatedDevice> {
        self.state
            .devices
            .read()
            .iter()
            .find(|d| d.info.id == device_id && d.info.kind == DeviceKind::VideoInput)
            .cloned()
    }
}

#[async_trait]
impl CaptureHost for SimulatedCaptureHost {
    async fn request_permission(&self) -> Result<(), DomainError> {
        if self.state.permission_denied.load(Ordering::SeqCst) {
            return Err(DomainError::PermissionDenied);
        }
        Ok(())
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DomainError> {
        Ok(self
            .state
            .devices
            .read()
            .iter()
            .map(|d| d.info.clone())
            .collect())
    }

    async fn open_stream(
        &self,
        device_id: &str,
        hint: ResolutionHint,
    ) -> Result<StreamHandle, DomainError> {
        self.state.open_requests.lock().push(device_id.to_string());

        let gate = self.state.gates.lock().get(device_id).cloned();
        if let Some(gate) = gate {
            debug!(device_id = %device_id, "Open held until released");
            gate.notified().await;
        }

        if self.state.permission_denied.load(Ordering::SeqCst) {
            return Err(DomainError::PermissionDenied);
        }

        let device = self
            .find(device_id)
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;

        if self.state.busy.read().contains(device_id) {
            return Err(DomainError::DeviceUnavailable {
                device_id: device_id.to_string(),
                message: "Device or resource busy".to_string(),
            });
        }

        self.state.live_streams.fetch_add(1, Ordering::SeqCst);
        info!(
            device_id = %device_id,
            width = hint.width,
            height = hint.height,
            "Simulated stream opened"
        );

        Ok(Arc::new(SimulatedStream {
            device_id: device_id.to_string(),
            capabilities: device.capabilities,
            values: Mutex::new(device.values),
            live: AtomicBool::new(true),
            host: Arc::clone(&self.state),
        }))
    }
}

struct SimulatedStream {
    device_id: String,
    capabilities: Capabilities,
    values: Mutex<HardwareValues>,
    live: AtomicBool,
    host: Arc<HostState>,
}

impl SimulatedStream {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::DeviceUnavailable {
                device_id: self.device_id.clone(),
                message: "Stream has been stopped".to_string(),
            })
        }
    }
}

#[async_trait]
impl CaptureStream for SimulatedStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    async fn capabilities(&self) -> Result<Capabilities, DomainError> {
        let gate = self.host.introspection_gates.lock().get(&self.device_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.ensure_live()?;
        if self.host.broken_introspection.read().contains(&self.device_id) {
            return Err(DomainError::DeviceUnavailable {
                device_id: self.device_id.clone(),
                message: "Control query failed".to_string(),
            });
        }
        Ok(self.capabilities.clone())
    }

    async fn current_values(&self) -> Result<HardwareValues, DomainError> {
        self.ensure_live()?;
        Ok(self.values.lock().clone())
    }

    async fn apply_constraint(&self, update: &SettingUpdate) -> Result<(), DomainError> {
        self.ensure_live()?;
        let field = update.field();

        if self.host.rejected.read().contains(&field) {
            return Err(DomainError::ConstraintRejected {
                field,
                reason: "Rejected by device".to_string(),
            });
        }

        match update {
            SettingUpdate::FocusMode(mode) => {
                if !self.capabilities.supports_focus_mode(*mode) {
                    return Err(DomainError::ConstraintRejected {
                        field,
                        reason: format!("Focus mode {} not supported", mode),
                    });
                }
            }
            other => {
                let value = other.numeric().unwrap_or_default();
                match self.capabilities.range(field) {
                    Some(range) if range.contains(value) => {}
                    Some(range) => {
                        return Err(DomainError::ConstraintRejected {
                            field,
                            reason: format!("{} outside {}", value, range),
                        });
                    }
                    None => {
                        return Err(DomainError::ConstraintRejected {
                            field,
                            reason: "Not supported by device".to_string(),
                        });
                    }
                }
            }
        }

        self.values.lock().record(update);
        self.host
            .applied
            .lock()
            .push((self.device_id.clone(), *update));
        Ok(())
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.host.live_streams.fetch_sub(1, Ordering::SeqCst);
            debug!(device_id = %self.device_id, "Simulated stream stopped");
        }
    }
}
