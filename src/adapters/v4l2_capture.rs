use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use v4l::capability::Flags as CapabilityFlags;
use v4l::control::{Control, Value};
use v4l::video::Capture;
use v4l::Device as V4lDevice;

use crate::domain::{
    Capabilities, CapabilityRange, DeviceInfo, DomainError, FocusMode, HardwareValues,
    ResolutionHint, SettingUpdate,
};
use crate::ports::{CaptureHost, CaptureStream, StreamHandle};

const CID_BRIGHTNESS: u32 = 0x0098_0900;
const CID_CONTRAST: u32 = 0x0098_0901;
const CID_FOCUS_ABSOLUTE: u32 = 0x009a_090a;
const CID_FOCUS_AUTO: u32 = 0x009a_090c;
const CID_ZOOM_ABSOLUTE: u32 = 0x009a_090d;

/// Video4Linux2 capture host. Device ids are node paths such as `/dev/video0`.
#[derive(Default)]
pub struct V4l2CaptureHost;

impl V4l2CaptureHost {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(device_id: &str, err: io::Error) -> DomainError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        DomainError::PermissionDenied
    } else if err.kind() == io::ErrorKind::NotFound {
        DomainError::DeviceNotFound(device_id.to_string())
    } else {
        DomainError::DeviceUnavailable {
            device_id: device_id.to_string(),
            message: err.to_string(),
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> DomainError {
    DomainError::Io(format!("Capture worker failed: {}", err))
}

fn is_capture_node(device: &V4lDevice) -> bool {
    device
        .query_caps()
        .map(|caps| caps.capabilities.contains(CapabilityFlags::VIDEO_CAPTURE))
        .unwrap_or(false)
}

#[async_trait]
impl CaptureHost for V4l2CaptureHost {
    async fn request_permission(&self) -> Result<(), DomainError> {
        tokio::task::spawn_blocking(|| {
            for node in v4l::context::enum_devices() {
                let path = node.path().to_path_buf();
                if let Err(e) = V4lDevice::with_path(&path) {
                    if e.kind() == io::ErrorKind::PermissionDenied {
                        warn!(path = ?path, "No read/write access to video node");
                        return Err(DomainError::PermissionDenied);
                    }
                }
            }
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DomainError> {
        tokio::task::spawn_blocking(|| {
            let mut nodes = v4l::context::enum_devices();
            nodes.sort_by_key(|node| node.index());

            let mut devices = Vec::new();
            for node in nodes {
                let path = node.path().to_path_buf();
                let device = match V4lDevice::with_path(&path) {
                    Ok(device) => device,
                    Err(e) => {
                        debug!(path = ?path, error = %e, "Skipping unreadable node");
                        continue;
                    }
                };
                if !is_capture_node(&device) {
                    continue;
                }
                let label = node.name().unwrap_or_default();
                devices.push(DeviceInfo::video(path.to_string_lossy(), label));
            }
            Ok(devices)
        })
        .await
        .map_err(join_error)?
    }

    async fn open_stream(
        &self,
        device_id: &str,
        hint: ResolutionHint,
    ) -> Result<StreamHandle, DomainError> {
        let id = device_id.to_string();
        let device = tokio::task::spawn_blocking(move || -> Result<V4lDevice, DomainError> {
            let device = V4lDevice::with_path(PathBuf::from(&id)).map_err(|e| io_error(&id, e))?;
            if !is_capture_node(&device) {
                return Err(DomainError::DeviceUnavailable {
                    device_id: id,
                    message: "Not a video capture device".to_string(),
                });
            }

            let mut format = device.format().map_err(|e| io_error(&id, e))?;
            format.width = hint.width;
            format.height = hint.height;
            let applied = device.set_format(&format).map_err(|e| io_error(&id, e))?;
            info!(
                device_id = %id,
                width = applied.width,
                height = applied.height,
                "V4L2 stream opened"
            );
            Ok(device)
        })
        .await
        .map_err(join_error)??;

        Ok(Arc::new(V4l2Stream {
            device_id: device_id.to_string(),
            device: Mutex::new(Some(device)),
        }))
    }
}

struct V4l2Stream {
    device_id: String,
    device: Mutex<Option<V4lDevice>>,
}

impl V4l2Stream {
    fn with_device<T>(
        &self,
        f: impl FnOnce(&V4lDevice) -> io::Result<T>,
    ) -> Result<T, DomainError> {
        let guard = self.device.lock();
        let device = guard.as_ref().ok_or_else(|| DomainError::DeviceUnavailable {
            device_id: self.device_id.clone(),
            message: "Stream has been stopped".to_string(),
        })?;
        f(device).map_err(|e| io_error(&self.device_id, e))
    }

    fn read_control(&self, id: u32) -> Option<f64> {
        match self.with_device(|d| d.control(id)) {
            Ok(Control {
                value: Value::Integer(v),
                ..
            }) => Some(v as f64),
            Ok(Control {
                value: Value::Boolean(b),
                ..
            }) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[async_trait]
impl CaptureStream for V4l2Stream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn is_live(&self) -> bool {
        self.device.lock().is_some()
    }

    async fn capabilities(&self) -> Result<Capabilities, DomainError> {
        let descriptions = self.with_device(|d| d.query_controls())?;

        let mut capabilities = Capabilities::default();
        for desc in descriptions {
            let range = CapabilityRange::new(desc.minimum as f64, desc.maximum as f64, desc.step as f64);
            match desc.id {
                CID_BRIGHTNESS => capabilities.brightness = range,
                CID_CONTRAST => capabilities.contrast = range,
                CID_ZOOM_ABSOLUTE => capabilities.zoom = range,
                CID_FOCUS_ABSOLUTE => capabilities.focus_distance = range,
                CID_FOCUS_AUTO => {
                    capabilities.focus_modes = vec![FocusMode::Continuous, FocusMode::Manual]
                }
                _ => {}
            }
        }
        Ok(capabilities)
    }

    async fn current_values(&self) -> Result<HardwareValues, DomainError> {
        if !self.is_live() {
            return Err(DomainError::StreamNotActive);
        }

        Ok(HardwareValues {
            focus_mode: self.read_control(CID_FOCUS_AUTO).map(|v| {
                if v != 0.0 {
                    FocusMode::Continuous
                } else {
                    FocusMode::Manual
                }
            }),
            focus_distance: self.read_control(CID_FOCUS_ABSOLUTE),
            zoom: self.read_control(CID_ZOOM_ABSOLUTE),
            brightness: self.read_control(CID_BRIGHTNESS),
            contrast: self.read_control(CID_CONTRAST),
        })
    }

    async fn apply_constraint(&self, update: &SettingUpdate) -> Result<(), DomainError> {
        let control = match *update {
            SettingUpdate::FocusMode(mode) => Control {
                id: CID_FOCUS_AUTO,
                value: Value::Boolean(mode == FocusMode::Continuous),
            },
            SettingUpdate::FocusDistance(v) => integer(CID_FOCUS_ABSOLUTE, v),
            SettingUpdate::Zoom(v) => integer(CID_ZOOM_ABSOLUTE, v),
            SettingUpdate::Brightness(v) => integer(CID_BRIGHTNESS, v),
            SettingUpdate::Contrast(v) => integer(CID_CONTRAST, v),
        };

        let field = update.field();
        self.with_device(|d| d.set_control(control))
            .map_err(|e| match e {
                DomainError::DeviceUnavailable { message, .. } => {
                    DomainError::ConstraintRejected { field, reason: message }
                }
                other => other,
            })
    }

    fn stop(&self) {
        if self.device.lock().take().is_some() {
            debug!(device_id = %self.device_id, "V4L2 device handle released");
        }
    }
}

fn integer(id: u32, value: f64) -> Control {
    Control {
        id,
        value: Value::Integer(value.round() as i64),
    }
}
