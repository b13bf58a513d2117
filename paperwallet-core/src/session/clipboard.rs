use crate::error::{PaperWalletError, Result};
use std::time::{Duration, Instant};

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";
/// How long a button reads `Copied!` after a successful copy.
pub const COPIED_FOR: Duration = Duration::from_secs(2);

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Label state of one copy button.
#[derive(Debug, Clone)]
pub struct CopyButton {
    label: String,
    copied_at: Option<Instant>,
}

impl Default for CopyButton {
    fn default() -> Self {
        Self::new(COPY_LABEL)
    }
}

impl CopyButton {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            copied_at: None,
        }
    }

    pub fn is_copied_at(&self, now: Instant) -> bool {
        self.copied_at
            .map_or(false, |at| now.saturating_duration_since(at) < COPIED_FOR)
    }

    pub fn label_at(&self, now: Instant) -> &str {
        if self.is_copied_at(now) {
            COPIED_LABEL
        } else {
            &self.label
        }
    }

    fn mark_copied(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }
}

/// Writes `text` to the clipboard and flips `button` to `Copied!`. On failure
/// the button keeps its label.
pub fn copy_text(
    text: &str,
    button: &mut CopyButton,
    clipboard: &mut dyn Clipboard,
    now: Instant,
) -> Result<()> {
    if let Err(e) = clipboard.write_text(text) {
        tracing::warn!("Clipboard write failed: {}", e);
        return Err(PaperWalletError::clipboard("Failed to copy to clipboard"));
    }
    button.mark_copied(now);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryClipboard;
    use super::*;

    #[test]
    fn test_label_flips_for_two_seconds() {
        let mut clipboard = MemoryClipboard::default();
        let mut button = CopyButton::default();
        let start = Instant::now();

        assert_eq!(button.label_at(start), "Copy");
        copy_text("bc1q", &mut button, &mut clipboard, start).unwrap();

        assert_eq!(clipboard.contents.as_deref(), Some("bc1q"));
        assert_eq!(button.label_at(start), "Copied!");
        assert_eq!(button.label_at(start + Duration::from_millis(1999)), "Copied!");
        assert_eq!(button.label_at(start + COPIED_FOR), "Copy");
    }

    #[test]
    fn test_failure_keeps_label() {
        let mut clipboard = MemoryClipboard {
            deny: true,
            ..Default::default()
        };
        let mut button = CopyButton::default();
        let now = Instant::now();

        let err = copy_text("secret", &mut button, &mut clipboard, now).unwrap_err();
        assert!(matches!(err, PaperWalletError::Clipboard(ref msg) if msg == "Failed to copy to clipboard"));
        assert_eq!(button.label_at(now), "Copy");
    }
}
