pub mod capture;
pub mod config;
pub mod error;
pub mod script;
pub mod stream;

pub use capture::{
    Capabilities, CapabilityRange, Device, DeviceInfo, DeviceKind, FocusMode, HardwareValues,
    ResolutionHint, SettingField, SettingUpdate, SettingsModel,
};
pub use config::{AppConfig, CaptureBackend};
pub use error::{DomainError, ScriptError};
pub use script::{Platform, ScriptFlavor, ScriptRequest};
pub use stream::{FailureReason, SessionEvent, StreamState};
