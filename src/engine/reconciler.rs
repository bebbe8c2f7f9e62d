use crate::domain::{Capabilities, FocusMode, HardwareValues, SettingField, SettingsModel};

/// Merge freshly observed hardware state into the settings model.
///
/// Per numeric field: the hardware-reported value, else the advertised
/// minimum, else the prior value. The result is clamped into the field's range
/// when one exists. Fields without a range keep a usable value but stay
/// unconstrained.
///
/// Focus mode: the hardware-reported mode, else the prior mode if the device
/// supports it (or advertises no modes), else the first advertised mode.
pub fn reconcile(
    prior: &SettingsModel,
    capabilities: &Capabilities,
    hardware: &HardwareValues,
) -> SettingsModel {
    let numeric = |field: SettingField| -> f64 {
        let range = capabilities.range(field);
        let fallback = prior.value(field).unwrap_or_default();
        let value = hardware
            .value(field)
            .filter(|v| v.is_finite())
            .or_else(|| range.map(|r| r.min))
            .unwrap_or(fallback);
        match range {
            Some(range) => range.clamp(value),
            None => value,
        }
    };

    SettingsModel {
        focus_mode: reconcile_focus_mode(prior.focus_mode, capabilities, hardware.focus_mode),
        focus_distance: numeric(SettingField::FocusDistance),
        zoom: numeric(SettingField::Zoom),
        brightness: numeric(SettingField::Brightness),
        contrast: numeric(SettingField::Contrast),
    }
}

fn reconcile_focus_mode(
    prior: FocusMode,
    capabilities: &Capabilities,
    reported: Option<FocusMode>,
) -> FocusMode {
    if let Some(mode) = reported {
        return mode;
    }
    if capabilities.focus_modes.is_empty() || capabilities.supports_focus_mode(prior) {
        return prior;
    }
    capabilities.focus_modes[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CapabilityRange;

    fn full_caps() -> Capabilities {
        Capabilities {
            focus_modes: vec![FocusMode::Manual, FocusMode::Continuous],
            focus_distance: CapabilityRange::new(10.0, 100.0, 1.0),
            zoom: CapabilityRange::new(1.0, 5.0, 0.1),
            brightness: CapabilityRange::new(0.0, 255.0, 1.0),
            contrast: CapabilityRange::new(0.0, 95.0, 1.0),
        }
    }

    #[test]
    fn test_hardware_value_wins() {
        let caps = Capabilities {
            zoom: CapabilityRange::new(1.0, 5.0, 0.1),
            ..Default::default()
        };
        let hw = HardwareValues {
            zoom: Some(1.0),
            ..Default::default()
        };

        let model = reconcile(&SettingsModel::default(), &caps, &hw);
        assert_eq!(model.zoom, 1.0);
    }

    #[test]
    fn test_minimum_used_when_hardware_silent() {
        let caps = full_caps();
        let model = reconcile(&SettingsModel::default(), &caps, &HardwareValues::default());

        assert_eq!(model.focus_distance, 10.0);
        assert_eq!(model.zoom, 1.0);
        assert_eq!(model.brightness, 0.0);
        assert_eq!(model.contrast, 0.0);
    }

    #[test]
    fn test_unsupported_field_keeps_prior_default() {
        let prior = SettingsModel {
            contrast: 42.0,
            ..Default::default()
        };
        let hw = HardwareValues {
            contrast: None,
            ..Default::default()
        };

        let model = reconcile(&prior, &Capabilities::default(), &hw);
        assert_eq!(model.contrast, 42.0);
        assert_eq!(model, prior);
    }

    #[test]
    fn test_out_of_range_hardware_value_clamped() {
        let caps = full_caps();
        let hw = HardwareValues {
            contrast: Some(128.0),
            zoom: Some(-3.0),
            brightness: Some(f64::NAN),
            ..Default::default()
        };

        let model = reconcile(&SettingsModel::default(), &caps, &hw);
        assert_eq!(model.contrast, 95.0);
        assert_eq!(model.zoom, 1.0);
        assert_eq!(model.brightness, 0.0);
    }

    #[test]
    fn test_result_always_within_ranges() {
        let caps = full_caps();
        let priors = [
            SettingsModel::default(),
            SettingsModel {
                focus_mode: FocusMode::Manual,
                focus_distance: -50.0,
                zoom: 99.0,
                brightness: 1e9,
                contrast: -1e9,
            },
        ];
        let readings = [
            HardwareValues::default(),
            HardwareValues {
                focus_mode: Some(FocusMode::Continuous),
                focus_distance: Some(1e6),
                zoom: Some(2.5),
                brightness: Some(-1.0),
                contrast: Some(f64::INFINITY),
            },
        ];

        for prior in &priors {
            for hw in &readings {
                let model = reconcile(prior, &caps, hw);
                assert!(model.within(&caps), "{:?} outside {:?}", model, caps);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let caps = full_caps();
        let hw = HardwareValues {
            zoom: Some(3.3),
            ..Default::default()
        };
        let prior = SettingsModel::default();

        assert_eq!(reconcile(&prior, &caps, &hw), reconcile(&prior, &caps, &hw));
    }

    #[test]
    fn test_focus_mode_precedence() {
        let caps = Capabilities {
            focus_modes: vec![FocusMode::Manual],
            ..Default::default()
        };
        let prior = SettingsModel::default();

        // Prior continuous is unsupported, first advertised wins.
        let model = reconcile(&prior, &caps, &HardwareValues::default());
        assert_eq!(model.focus_mode, FocusMode::Manual);

        // Reported mode beats everything.
        let hw = HardwareValues {
            focus_mode: Some(FocusMode::Continuous),
            ..Default::default()
        };
        assert_eq!(reconcile(&prior, &caps, &hw).focus_mode, FocusMode::Continuous);

        // No advertised modes keeps prior.
        let model = reconcile(&prior, &Capabilities::default(), &HardwareValues::default());
        assert_eq!(model.focus_mode, FocusMode::Continuous);
    }
}
