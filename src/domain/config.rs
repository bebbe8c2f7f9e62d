use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::capture::ResolutionHint;
use super::error::DomainError;
use super::script::{Platform, ScriptFlavor};

/// Capture host implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// In-process demo cameras.
    Simulated,
    /// Video4Linux2 devices (requires the `v4l2` feature).
    V4l2,
}

impl fmt::Display for CaptureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureBackend::Simulated => write!(f, "simulated"),
            CaptureBackend::V4l2 => write!(f, "v4l2"),
        }
    }
}

impl FromStr for CaptureBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(CaptureBackend::Simulated),
            "v4l2" => Ok(CaptureBackend::V4l2),
            other => Err(DomainError::Config(format!("Unknown capture backend '{}'", other))),
        }
    }
}

/// Capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub backend: CaptureBackend,
    /// Preferred stream width in pixels.
    pub preferred_width: u32,
    /// Preferred stream height in pixels.
    pub preferred_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let hint = ResolutionHint::default();
        Self {
            backend: if cfg!(all(feature = "v4l2", target_os = "linux")) {
                CaptureBackend::V4l2
            } else {
                CaptureBackend::Simulated
            },
            preferred_width: hint.width,
            preferred_height: hint.height,
        }
    }
}

impl CaptureConfig {
    pub fn resolution_hint(&self) -> ResolutionHint {
        ResolutionHint {
            width: self.preferred_width,
            height: self.preferred_height,
        }
    }
}

/// Script generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Base URL of the text-generation API.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Environment variable holding the API key. The key itself is never stored.
    pub api_key_env: String,
    pub default_platform: Platform,
    pub default_flavor: ScriptFlavor,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            default_platform: Platform::current(),
            default_flavor: ScriptFlavor::Shell,
        }
    }
}

/// Outbound network policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// When true, every outbound request is refused.
    pub local_only: bool,
    /// Hosts the script generator may contact.
    pub allowed_domains: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_only: false,
            allowed_domains: Self::default_allowed_domains(),
        }
    }
}

impl NetworkConfig {
    pub fn default_allowed_domains() -> Vec<String> {
        vec!["generativelanguage.googleapis.com".to_string()]
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub script: ScriptConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
