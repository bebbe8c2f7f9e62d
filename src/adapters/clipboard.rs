use arboard::Clipboard;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::domain::DomainError;
use crate::ports::ClipboardWriter;

/// System clipboard via `arboard`.
///
/// The clipboard is opened lazily on first use so headless sessions can still
/// start; the copy action then reports the failure.
#[derive(Default)]
pub struct ArboardClipboard {
    clipboard: Mutex<Option<Clipboard>>,
}

impl ArboardClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for ArboardClipboard {
    fn copy_text(&self, text: &str) -> Result<(), DomainError> {
        let mut slot = self.clipboard.lock();
        if slot.is_none() {
            let clipboard = Clipboard::new()
                .map_err(|e| DomainError::Clipboard(format!("Failed to initialize clipboard: {}", e)))?;
            debug!("Clipboard initialized");
            *slot = Some(clipboard);
        }

        if let Some(clipboard) = slot.as_mut() {
            clipboard
                .set_text(text)
                .map_err(|e| DomainError::Clipboard(format!("Failed to set clipboard text: {}", e)))?;
        }

        info!(chars = text.len(), "Script copied to clipboard");
        Ok(())
    }
}
