//! Keyboard focus cycling and control announcements
//!
//! Tab inside the text input cycles focus across the four controls in a
//! fixed order; the newly focused control is announced through speech output
//! after a short settle delay. Focusing the voice or stop control by any
//! other means announces it too, with exactly one announcement per focus
//! event.

use crate::speech::{Control, SpeechOutputHandle};
use std::time::{Duration, Instant};

/// Delay between moving focus and announcing the focused control
pub const ANNOUNCE_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Next control in the fixed cyclic order.
///
/// Focus outside the known set restarts the cycle at the text input.
pub fn next_control(current: Option<Control>) -> Control {
    match current {
        None => Control::TextInput,
        Some(Control::TextInput) => Control::Send,
        Some(Control::Send) => Control::Voice,
        Some(Control::Voice) => Control::Stop,
        Some(Control::Stop) => Control::TextInput,
    }
}

/// Tracks focus across the interactive controls and drives announcements
pub struct FocusNavigator {
    /// Control observed focused during the current frame
    focused: Option<Control>,
    /// Control observed focused during the previous frame
    prev_focused: Option<Control>,
    /// Control that should receive focus this frame
    focus_request: Option<Control>,
    /// Announcement waiting for its settle delay
    pending_announcement: Option<(Control, Instant)>,
}

impl FocusNavigator {
    pub fn new() -> Self {
        Self {
            focused: None,
            prev_focused: None,
            focus_request: None,
            pending_announcement: None,
        }
    }

    /// Reset per-frame observations; call before widgets are laid out
    pub fn begin_frame(&mut self) {
        self.focused = None;
    }

    /// Record whether a control holds focus this frame
    pub fn observe(&mut self, control: Control, has_focus: bool) {
        if has_focus {
            self.focused = Some(control);
        }
    }

    /// Whether the text input held focus last frame (gates Tab interception)
    pub fn input_focused(&self) -> bool {
        self.prev_focused == Some(Control::TextInput)
    }

    /// Handle an intercepted Tab press: cycle focus and schedule the
    /// announcement
    pub fn navigate(&mut self) {
        let next = next_control(self.prev_focused);
        self.focus_request = Some(next);
        self.pending_announcement = Some((next, Instant::now() + ANNOUNCE_SETTLE_DELAY));
    }

    /// Whether `control` should grab focus this frame; consumes the request
    pub fn take_focus_request(&mut self, control: Control) -> bool {
        if self.focus_request == Some(control) {
            self.focus_request = None;
            true
        } else {
            false
        }
    }

    /// Whether an announcement is still waiting on its settle delay
    pub fn has_pending_announcement(&self) -> bool {
        self.pending_announcement.is_some()
    }

    /// Apply focus-change announcements and fire any due pending one; call
    /// after widgets are laid out
    pub fn end_frame(&mut self, speech: &SpeechOutputHandle) {
        if self.focused != self.prev_focused {
            if let Some(control) = self.focused {
                // Voice and stop announce on focus however it arrived; a
                // pending Tab announcement for the same control covers it
                let nav_pending = matches!(
                    self.pending_announcement,
                    Some((pending, _)) if pending == control
                );
                if matches!(control, Control::Voice | Control::Stop) && !nav_pending {
                    speech.announce(control);
                }
            }
            self.prev_focused = self.focused;
        }

        if let Some((control, due)) = self.pending_announcement {
            if Instant::now() >= due {
                self.pending_announcement = None;
                speech.announce(control);
            }
        }
    }
}

impl Default for FocusNavigator {
    fn default() -> Self {
        Self::new()
    }
}
