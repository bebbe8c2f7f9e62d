use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Operating system the generated startup script targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the running binary, falling back to Linux.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::MacOs => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "mac" | "darwin" => Ok(Platform::MacOs),
            "windows" | "win" => Ok(Platform::Windows),
            other => Err(DomainError::InvalidSetting(format!("Unknown platform '{}'", other))),
        }
    }
}

/// Shape of the generated automation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFlavor {
    /// Native shell script (bash, zsh or PowerShell).
    Shell,
    /// Self-contained Python 3 script.
    Standalone,
}

impl fmt::Display for ScriptFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptFlavor::Shell => write!(f, "shell"),
            ScriptFlavor::Standalone => write!(f, "standalone"),
        }
    }
}

impl FromStr for ScriptFlavor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shell" | "sh" => Ok(ScriptFlavor::Shell),
            "standalone" | "python" | "py" => Ok(ScriptFlavor::Standalone),
            other => Err(DomainError::InvalidSetting(format!("Unknown script flavor '{}'", other))),
        }
    }
}

/// Outbound request for the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRequest {
    pub platform: Platform,
    pub flavor: ScriptFlavor,
    /// Complete prompt text.
    pub prompt: String,
}
