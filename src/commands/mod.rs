use std::fmt::Write as _;

use crate::app::AppController;
use crate::domain::{
    DomainError, Platform, ScriptFlavor, SettingField, SettingUpdate, SettingsModel,
};
use crate::engine::ApplyOutcome;

pub const HELP: &str = "\
Commands:
  devices                        list cameras
  select <id>                    open a camera and load its settings
  show                           show stream state and settings
  set <field> <value>            change focus-mode, focus-distance, zoom, brightness or contrast
  generate [platform] [flavor]   generate a startup script (linux|macos|windows, shell|standalone)
  copy                           copy the last script to the clipboard
  close                          release the camera
  help                           show this help
  quit                           close and exit";

/// One line of control-panel input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Devices,
    Select(String),
    Show,
    Set(SettingUpdate),
    Generate {
        platform: Option<Platform>,
        flavor: Option<ScriptFlavor>,
    },
    Copy,
    Close,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, DomainError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "devices" | "list" | "ls" => Command::Devices,
        "select" | "open" => match args.as_slice() {
            [id] => Command::Select((*id).to_string()),
            _ => return Err(usage("select <id>")),
        },
        "show" | "status" => Command::Show,
        "set" => match args.as_slice() {
            [field, value] => {
                let field: SettingField = field.parse()?;
                Command::Set(SettingUpdate::parse(field, value)?)
            }
            _ => return Err(usage("set <field> <value>")),
        },
        "generate" | "gen" => {
            let mut platform = None;
            let mut flavor = None;
            for arg in args {
                if let Ok(p) = arg.parse::<Platform>() {
                    platform = Some(p);
                } else {
                    flavor = Some(arg.parse::<ScriptFlavor>()?);
                }
            }
            Command::Generate { platform, flavor }
        }
        "copy" => Command::Copy,
        "close" => Command::Close,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(DomainError::InvalidSetting(format!(
                "Unknown command '{}'. Type 'help' for the list",
                other
            )))
        }
    };
    Ok(Some(command))
}

fn usage(text: &str) -> DomainError {
    DomainError::InvalidSetting(format!("Usage: {}", text))
}

/// Run a command against the controller and render the result for display.
pub async fn execute(controller: &AppController, command: Command) -> Result<String, String> {
    let session = controller.session();

    match command {
        Command::Devices => {
            let devices = session.refresh_devices().await.map_err(|e| e.to_string())?;
            if devices.is_empty() {
                return Ok("No cameras found".to_string());
            }
            let state = session.stream_state();
            let active = state.active_device_id();
            let mut out = String::new();
            for device in &devices {
                let marker = if active == Some(device.id.as_str()) { "*" } else { " " };
                let _ = writeln!(out, "{} {}  {}", marker, device.id, device.label);
            }
            Ok(out.trim_end().to_string())
        }
        Command::Select(id) => {
            let settings = session.select_device(&id).await.map_err(|e| e.to_string())?;
            let label = session.active_device_label().unwrap_or(id);
            Ok(format!("Opened {}\n{}", label, render_settings(controller, &settings)))
        }
        Command::Show => {
            let mut out = format!("Stream: {}", session.stream_state());
            if let Some(label) = session.active_device_label() {
                let _ = write!(out, "\nCamera: {}", label);
            }
            if controller.scripts().is_generating() {
                out.push_str("\nScript: generating");
            }
            let _ = write!(out, "\n{}", render_settings(controller, &session.settings()));
            Ok(out)
        }
        Command::Set(update) => {
            let field = update.field();
            let outcome = session.update_setting(update).await;
            let settings = session.settings();
            let value = match settings.value(field) {
                Some(v) => v.to_string(),
                None => settings.focus_mode.to_string(),
            };
            Ok(match outcome {
                ApplyOutcome::Applied => format!("{} = {}", field, value),
                ApplyOutcome::NotSent => format!("{} = {} (not sent to camera)", field, value),
                ApplyOutcome::AppliedWithWarning(reason) => {
                    format!("{} = {} (camera refused: {})", field, value, reason)
                }
            })
        }
        Command::Generate { platform, flavor } => controller
            .generate_script(platform, flavor)
            .await
            .map_err(|e| e.to_string()),
        Command::Copy => controller
            .copy_last_script()
            .map(|chars| format!("Copied {} characters to the clipboard", chars))
            .map_err(|e| e.to_string()),
        Command::Close => {
            session.close();
            Ok("Stream closed".to_string())
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => {
            controller.shutdown();
            Ok("Bye".to_string())
        }
    }
}

fn render_settings(controller: &AppController, settings: &SettingsModel) -> String {
    let capabilities = controller.session().capabilities();
    let mut out = String::new();

    let modes: Vec<String> = capabilities
        .focus_modes
        .iter()
        .map(|m| m.to_string())
        .collect();
    let _ = write!(out, "  {:<15} {}", SettingField::FocusMode, settings.focus_mode);
    if !modes.is_empty() {
        let _ = write!(out, "  [{}]", modes.join(", "));
    }

    for field in SettingField::NUMERIC {
        let value = settings.value(field).unwrap_or_default();
        let _ = write!(out, "\n  {:<15} {}", field, value);
        match capabilities.range(field) {
            Some(range) => {
                let _ = write!(out, "  [{}]", range);
            }
            None => out.push_str("  [not supported]"),
        }
    }
    out
}
