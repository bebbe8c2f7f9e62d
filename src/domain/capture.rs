use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A video capture device as presented to the user.
///
/// Recreated on every enumeration; the id is only stable within one host session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque host-assigned identifier.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

/// Kind of an entry in the host's media device inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Raw inventory entry as reported by the host, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }
}

/// Hardware-advertised bounds for one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl CapabilityRange {
    /// Build a range, returning `None` when the bounds are unusable.
    ///
    /// A negative or non-finite step is normalized to 0 (continuous).
    pub fn new(min: f64, max: f64, step: f64) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return None;
        }
        let step = if step.is_finite() && step > 0.0 { step } else { 0.0 };
        Some(Self { min, max, step })
    }

    /// Re-validate a range that may have come from an untrusted source.
    pub fn validated(self) -> Option<Self> {
        Self::new(self.min, self.max, self.step)
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value into `[min, max]`. Non-finite input maps to `min`.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

impl fmt::Display for CapabilityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={} (step {})", self.min, self.max, self.step)
    }
}

/// Autofocus behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    Continuous,
    Manual,
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusMode::Continuous => write!(f, "continuous"),
            FocusMode::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for FocusMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" | "auto" => Ok(FocusMode::Continuous),
            "manual" => Ok(FocusMode::Manual),
            other => Err(DomainError::InvalidSetting(format!(
                "Unknown focus mode '{}' (expected continuous or manual)",
                other
            ))),
        }
    }
}

/// The tunable parameters known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingField {
    FocusMode,
    FocusDistance,
    Zoom,
    Brightness,
    Contrast,
}

impl SettingField {
    /// Fields carrying a numeric value bounded by a [`CapabilityRange`].
    pub const NUMERIC: [SettingField; 4] = [
        SettingField::FocusDistance,
        SettingField::Zoom,
        SettingField::Brightness,
        SettingField::Contrast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SettingField::FocusMode => "focus-mode",
            SettingField::FocusDistance => "focus-distance",
            SettingField::Zoom => "zoom",
            SettingField::Brightness => "brightness",
            SettingField::Contrast => "contrast",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "focus-mode" | "focus" => Ok(SettingField::FocusMode),
            "focus-distance" | "distance" => Ok(SettingField::FocusDistance),
            "zoom" => Ok(SettingField::Zoom),
            "brightness" => Ok(SettingField::Brightness),
            "contrast" => Ok(SettingField::Contrast),
            other => Err(DomainError::InvalidSetting(format!("Unknown field '{}'", other))),
        }
    }
}

/// Ranges advertised by the hardware behind one open stream.
///
/// `None` means the parameter is not exposed. Only valid for the stream it was
/// read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Supported focus modes; empty when focus mode cannot be changed.
    pub focus_modes: Vec<FocusMode>,
    pub focus_distance: Option<CapabilityRange>,
    pub zoom: Option<CapabilityRange>,
    pub brightness: Option<CapabilityRange>,
    pub contrast: Option<CapabilityRange>,
}

impl Capabilities {
    /// Range for a numeric field. Always `None` for [`SettingField::FocusMode`].
    pub fn range(&self, field: SettingField) -> Option<CapabilityRange> {
        match field {
            SettingField::FocusMode => None,
            SettingField::FocusDistance => self.focus_distance,
            SettingField::Zoom => self.zoom,
            SettingField::Brightness => self.brightness,
            SettingField::Contrast => self.contrast,
        }
    }

    /// Whether the hardware exposes this field at all.
    #[must_use]
    pub fn supports(&self, field: SettingField) -> bool {
        match field {
            SettingField::FocusMode => !self.focus_modes.is_empty(),
            other => self.range(other).is_some(),
        }
    }

    #[must_use]
    pub fn supports_focus_mode(&self, mode: FocusMode) -> bool {
        self.focus_modes.contains(&mode)
    }
}

/// Values currently reported by the hardware. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareValues {
    pub focus_mode: Option<FocusMode>,
    pub focus_distance: Option<f64>,
    pub zoom: Option<f64>,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
}

impl HardwareValues {
    /// Numeric value for a field, if reported.
    pub fn value(&self, field: SettingField) -> Option<f64> {
        match field {
            SettingField::FocusMode => None,
            SettingField::FocusDistance => self.focus_distance,
            SettingField::Zoom => self.zoom,
            SettingField::Brightness => self.brightness,
            SettingField::Contrast => self.contrast,
        }
    }

    /// Record an accepted update as the new hardware value.
    pub fn record(&mut self, update: &SettingUpdate) {
        match *update {
            SettingUpdate::FocusMode(mode) => self.focus_mode = Some(mode),
            SettingUpdate::FocusDistance(v) => self.focus_distance = Some(v),
            SettingUpdate::Zoom(v) => self.zoom = Some(v),
            SettingUpdate::Brightness(v) => self.brightness = Some(v),
            SettingUpdate::Contrast(v) => self.contrast = Some(v),
        }
    }
}

/// The session's source of truth for capture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsModel {
    pub focus_mode: FocusMode,
    pub focus_distance: f64,
    pub zoom: f64,
    pub brightness: f64,
    pub contrast: f64,
}

impl Default for SettingsModel {
    fn default() -> Self {
        Self {
            focus_mode: FocusMode::Continuous,
            focus_distance: 0.0,
            zoom: 1.0,
            brightness: 128.0,
            contrast: 128.0,
        }
    }
}

impl SettingsModel {
    /// Numeric value of a field. `None` for the focus mode.
    pub fn value(&self, field: SettingField) -> Option<f64> {
        match field {
            SettingField::FocusMode => None,
            SettingField::FocusDistance => Some(self.focus_distance),
            SettingField::Zoom => Some(self.zoom),
            SettingField::Brightness => Some(self.brightness),
            SettingField::Contrast => Some(self.contrast),
        }
    }

    /// Replace exactly one field.
    pub fn apply(&mut self, update: &SettingUpdate) {
        match *update {
            SettingUpdate::FocusMode(mode) => self.focus_mode = mode,
            SettingUpdate::FocusDistance(v) => self.focus_distance = v,
            SettingUpdate::Zoom(v) => self.zoom = v,
            SettingUpdate::Brightness(v) => self.brightness = v,
            SettingUpdate::Contrast(v) => self.contrast = v,
        }
    }

    /// Check that every numeric field lies inside its advertised range.
    #[must_use]
    pub fn within(&self, capabilities: &Capabilities) -> bool {
        SettingField::NUMERIC.iter().all(|&field| {
            match (capabilities.range(field), self.value(field)) {
                (Some(range), Some(value)) => range.contains(value),
                _ => true,
            }
        })
    }
}

/// A single-field change, used both for the in-memory model and as the
/// constraint pushed to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "kebab-case")]
pub enum SettingUpdate {
    FocusMode(FocusMode),
    FocusDistance(f64),
    Zoom(f64),
    Brightness(f64),
    Contrast(f64),
}

impl SettingUpdate {
    pub fn field(&self) -> SettingField {
        match self {
            SettingUpdate::FocusMode(_) => SettingField::FocusMode,
            SettingUpdate::FocusDistance(_) => SettingField::FocusDistance,
            SettingUpdate::Zoom(_) => SettingField::Zoom,
            SettingUpdate::Brightness(_) => SettingField::Brightness,
            SettingUpdate::Contrast(_) => SettingField::Contrast,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match *self {
            SettingUpdate::FocusMode(_) => None,
            SettingUpdate::FocusDistance(v)
            | SettingUpdate::Zoom(v)
            | SettingUpdate::Brightness(v)
            | SettingUpdate::Contrast(v) => Some(v),
        }
    }

    fn with_numeric(self, value: f64) -> Self {
        match self {
            SettingUpdate::FocusMode(_) => self,
            SettingUpdate::FocusDistance(_) => SettingUpdate::FocusDistance(value),
            SettingUpdate::Zoom(_) => SettingUpdate::Zoom(value),
            SettingUpdate::Brightness(_) => SettingUpdate::Brightness(value),
            SettingUpdate::Contrast(_) => SettingUpdate::Contrast(value),
        }
    }

    /// Clamp the value into the field's advertised range, if there is one.
    #[must_use]
    pub fn clamped(self, capabilities: &Capabilities) -> Self {
        match (self.numeric(), capabilities.range(self.field())) {
            (Some(value), Some(range)) => self.with_numeric(range.clamp(value)),
            _ => self,
        }
    }

    /// Parse a user-entered value for a field.
    pub fn parse(field: SettingField, raw: &str) -> Result<Self, DomainError> {
        match field {
            SettingField::FocusMode => Ok(SettingUpdate::FocusMode(raw.parse()?)),
            SettingField::FocusDistance => Ok(SettingUpdate::FocusDistance(parse_number(field, raw)?)),
            SettingField::Zoom => Ok(SettingUpdate::Zoom(parse_number(field, raw)?)),
            SettingField::Brightness => Ok(SettingUpdate::Brightness(parse_number(field, raw)?)),
            SettingField::Contrast => Ok(SettingUpdate::Contrast(parse_number(field, raw)?)),
        }
    }
}

fn parse_number(field: SettingField, raw: &str) -> Result<f64, DomainError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| DomainError::InvalidSetting(format!("'{}' is not a number", raw.trim())))?;
    if !value.is_finite() {
        return Err(DomainError::InvalidSetting(format!("{} must be finite", field)));
    }
    Ok(value)
}

/// Preferred capture resolution passed when opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionHint {
    pub width: u32,
    pub height: u32,
}

impl Default for ResolutionHint {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_range_rejects_inverted_bounds() {
        assert!(CapabilityRange::new(5.0, 1.0, 0.1).is_none());
        assert!(CapabilityRange::new(f64::NAN, 1.0, 0.1).is_none());
        assert_eq!(CapabilityRange::new(0.0, 1.0, -2.0).unwrap().step, 0.0);
    }

    #[test]
    fn test_capability_range_clamp() {
        let range = CapabilityRange::new(1.0, 5.0, 0.1).unwrap();
        assert_eq!(range.clamp(0.0), 1.0);
        assert_eq!(range.clamp(9.0), 5.0);
        assert_eq!(range.clamp(3.0), 3.0);
        assert_eq!(range.clamp(f64::NAN), 1.0);
    }

    #[test]
    fn test_setting_field_parse() {
        assert_eq!("zoom".parse::<SettingField>().unwrap(), SettingField::Zoom);
        assert_eq!(
            "focus_distance".parse::<SettingField>().unwrap(),
            SettingField::FocusDistance
        );
        assert!("saturation".parse::<SettingField>().is_err());
    }

    #[test]
    fn test_setting_update_parse() {
        assert_eq!(
            SettingUpdate::parse(SettingField::Zoom, "3").unwrap(),
            SettingUpdate::Zoom(3.0)
        );
        assert_eq!(
            SettingUpdate::parse(SettingField::FocusMode, "Manual").unwrap(),
            SettingUpdate::FocusMode(FocusMode::Manual)
        );
        assert!(SettingUpdate::parse(SettingField::Brightness, "bright").is_err());
        assert!(SettingUpdate::parse(SettingField::Contrast, "inf").is_err());
    }

    #[test]
    fn test_setting_update_clamped_only_with_range() {
        let caps = Capabilities {
            zoom: CapabilityRange::new(1.0, 5.0, 0.1),
            ..Default::default()
        };
        assert_eq!(SettingUpdate::Zoom(10.0).clamped(&caps), SettingUpdate::Zoom(5.0));
        assert_eq!(
            SettingUpdate::Contrast(900.0).clamped(&caps),
            SettingUpdate::Contrast(900.0)
        );
    }

    #[test]
    fn test_settings_model_apply_single_field() {
        let mut model = SettingsModel::default();
        model.apply(&SettingUpdate::Zoom(2.5));
        assert_eq!(model.zoom, 2.5);
        assert_eq!(model.brightness, SettingsModel::default().brightness);
    }

    #[test]
    fn test_settings_model_within() {
        let caps = Capabilities {
            zoom: CapabilityRange::new(1.0, 5.0, 0.1),
            ..Default::default()
        };
        let mut model = SettingsModel::default();
        assert!(model.within(&caps));
        model.zoom = 7.0;
        assert!(!model.within(&caps));
    }

    #[test]
    fn test_setting_update_serializes_tagged() {
        let json = serde_json::to_string(&SettingUpdate::Zoom(3.0)).unwrap();
        assert_eq!(json, r#"{"field":"zoom","value":3.0}"#);
    }
}
