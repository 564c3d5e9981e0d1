//! Login overlay state
//!
//! Show/hide calls are last-write-wins, so concurrent 401s collapse into a
//! single visible overlay.

use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub visible: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct LoginOverlay {
    state: Mutex<OverlaySnapshot>,
}

impl LoginOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self) {
        self.state.lock().visible = true;
    }

    pub fn hide(&self) {
        self.state.lock().visible = false;
    }

    /// Set the form error; an empty message clears it
    pub fn show_error(&self, message: &str) {
        let mut state = self.state.lock();
        state.error = if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        };
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_hide_last_write_wins() {
        let overlay = LoginOverlay::new();
        overlay.show();
        overlay.show();
        overlay.hide();
        assert!(!overlay.is_visible());
        overlay.show();
        assert!(overlay.is_visible());
    }

    #[test]
    fn test_empty_error_clears() {
        let overlay = LoginOverlay::new();
        overlay.show_error("Login failed");
        assert_eq!(overlay.error().as_deref(), Some("Login failed"));
        overlay.show_error("");
        assert_eq!(overlay.error(), None);
    }
}
