use crate::domain::DomainError;

/// Port for handing generated text to the user's clipboard.
pub trait ClipboardWriter: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn copy_text(&self, text: &str) -> Result<(), DomainError>;
}
