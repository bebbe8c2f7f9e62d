pub mod clipboard;
pub mod config_store;
pub mod gemini;
pub mod network_guard;
pub mod simulated_capture;
#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub mod v4l2_capture;

pub use clipboard::ArboardClipboard;
pub use config_store::TomlConfigStore;
pub use gemini::{ApiKey, GeminiScriptGenerator};
pub use network_guard::NetworkGuard;
pub use simulated_capture::{SimulatedCaptureHost, SimulatedDevice};
#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub use v4l2_capture::V4l2CaptureHost;
