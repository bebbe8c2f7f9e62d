use std::fmt::Write;

use crate::domain::{
    Platform, ScriptError, ScriptFlavor, ScriptRequest, SettingField, SettingsModel,
};

/// Assemble the prompt for the text-generation service.
///
/// Deterministic in its inputs; every setting is listed, focus mode included.
pub fn build_request(
    settings: &SettingsModel,
    device_label: &str,
    platform: Platform,
    flavor: ScriptFlavor,
) -> ScriptRequest {
    let mut prompt = String::new();

    let language = script_language(platform, flavor);
    let _ = writeln!(
        prompt,
        "Write a {} script for {} that re-applies camera settings at machine startup.",
        language,
        platform.display_name()
    );
    let _ = writeln!(prompt, "Target camera: \"{}\".", device_label);
    let _ = writeln!(prompt, "Settings to apply:");
    let _ = writeln!(prompt, "- focus mode: {}", settings.focus_mode);
    for field in SettingField::NUMERIC {
        if let Some(value) = settings.value(field) {
            let _ = writeln!(prompt, "- {}: {}", field, value);
        }
    }
    let _ = writeln!(prompt, "Tooling hint: {}", tooling_hint(platform));
    let _ = writeln!(
        prompt,
        "Select the camera by its name, skip settings the camera does not support, \
         and explain how to register the script to run at login."
    );
    let _ = write!(
        prompt,
        "Reply with the script in a single fenced code block followed by brief setup steps."
    );

    ScriptRequest {
        platform,
        flavor,
        prompt,
    }
}

/// Turn the raw service reply into script text.
///
/// A single fenced code block is unwrapped; otherwise the trimmed reply is
/// returned as-is.
pub fn extract_script(response: Result<String, ScriptError>) -> Result<String, ScriptError> {
    let text = response?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ScriptError::Service("Empty response from service".to_string()));
    }

    if let Some(body) = fenced_body(trimmed) {
        return Ok(body);
    }
    Ok(trimmed.to_string())
}

fn fenced_body(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let newline = after_fence.find('\n')?;
    let body = &after_fence[newline + 1..];
    let end = body.find("```")?;
    let script = body[..end].trim_end();
    if script.is_empty() {
        None
    } else {
        Some(script.to_string())
    }
}

fn script_language(platform: Platform, flavor: ScriptFlavor) -> &'static str {
    match (flavor, platform) {
        (ScriptFlavor::Standalone, _) => "standalone Python 3",
        (ScriptFlavor::Shell, Platform::Linux) => "bash",
        (ScriptFlavor::Shell, Platform::MacOs) => "zsh",
        (ScriptFlavor::Shell, Platform::Windows) => "PowerShell",
    }
}

fn tooling_hint(platform: Platform) -> &'static str {
    match platform {
        Platform::Linux => "v4l2-ctl from v4l-utils (focus_automatic_continuous, focus_absolute, zoom_absolute, brightness, contrast)",
        Platform::MacOs => "uvc-util or an equivalent UVC control tool",
        Platform::Windows => "DirectShow IAMCameraControl / IAMVideoProcAmp via a helper or ffmpeg -f dshow",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FocusMode;

    #[test]
    fn test_prompt_lists_every_setting() {
        let settings = SettingsModel {
            focus_mode: FocusMode::Manual,
            focus_distance: 40.0,
            zoom: 3.0,
            brightness: 140.0,
            contrast: 90.0,
        };

        let request = build_request(&settings, "Cam A", Platform::Linux, ScriptFlavor::Shell);
        assert_eq!(request.platform, Platform::Linux);
        assert!(request.prompt.contains("bash"));
        assert!(request.prompt.contains("\"Cam A\""));
        assert!(request.prompt.contains("focus mode: manual"));
        assert!(request.prompt.contains("focus-distance: 40"));
        assert!(request.prompt.contains("zoom: 3"));
        assert!(request.prompt.contains("brightness: 140"));
        assert!(request.prompt.contains("contrast: 90"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let settings = SettingsModel::default();
        let a = build_request(&settings, "Cam", Platform::Windows, ScriptFlavor::Standalone);
        let b = build_request(&settings, "Cam", Platform::Windows, ScriptFlavor::Standalone);
        assert_eq!(a, b);
        assert!(a.prompt.contains("Python"));
    }

    #[test]
    fn test_extract_fenced_script() {
        let reply = "Here you go:\n```bash\n#!/bin/bash\nv4l2-ctl -c zoom_absolute=3\n```\nRun it at login.";
        assert_eq!(
            extract_script(Ok(reply.to_string())).unwrap(),
            "#!/bin/bash\nv4l2-ctl -c zoom_absolute=3"
        );
    }

    #[test]
    fn test_extract_plain_reply() {
        assert_eq!(
            extract_script(Ok("  echo hi \n".to_string())).unwrap(),
            "echo hi"
        );
    }

    #[test]
    fn test_extract_empty_reply_is_service_error() {
        assert!(matches!(
            extract_script(Ok("   ".to_string())),
            Err(ScriptError::Service(_))
        ));
    }

    #[test]
    fn test_missing_credential_passes_through() {
        let err = extract_script(Err(ScriptError::MissingCredential("set KEY".to_string())));
        assert_eq!(err, Err(ScriptError::MissingCredential("set KEY".to_string())));
    }
}
