//! Transient, auto-dismissing status toasts.

use eframe::egui::Color32;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a toast stays fully visible.
pub const DISPLAY_WINDOW: Duration = Duration::from_secs(3);
/// Exit-transition window after the display window ends.
pub const FADE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Toast background color per severity.
    pub fn background(self) -> Color32 {
        match self {
            Severity::Info => Color32::from_rgb(0x48, 0xbb, 0x78),
            Severity::Warning => Color32::from_rgb(0xed, 0x89, 0x36),
            Severity::Error => Color32::from_rgb(0xf5, 0x65, 0x65),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    created: Instant,
}

impl Toast {
    /// Opacity at `now`, or `None` once the toast has fully left the screen.
    pub fn opacity(&self, now: Instant) -> Option<f32> {
        opacity_at(now.saturating_duration_since(self.created))
    }
}

pub fn opacity_at(elapsed: Duration) -> Option<f32> {
    if elapsed <= DISPLAY_WINDOW {
        return Some(1.0);
    }
    let fading = elapsed - DISPLAY_WINDOW;
    if fading >= FADE_WINDOW {
        return None;
    }
    Some(1.0 - fading.as_secs_f32() / FADE_WINDOW.as_secs_f32())
}

/// Toast stack. Each notification is independent: rapid-fire calls stack
/// visually, nothing is coalesced or rate limited.
#[derive(Default)]
pub struct Notifier {
    toasts: Vec<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        debug!("toast ({severity:?}): {message}");
        self.toasts.push(Toast {
            message,
            severity,
            created: Instant::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(message, Severity::Info);
    }

    /// Drop toasts whose exit transition has finished.
    pub fn sweep(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.opacity(now).is_some());
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_is_opaque_through_the_display_window() {
        assert_eq!(opacity_at(Duration::ZERO), Some(1.0));
        assert_eq!(opacity_at(Duration::from_millis(2_999)), Some(1.0));
        assert_eq!(opacity_at(DISPLAY_WINDOW), Some(1.0));
    }

    #[test]
    fn toast_fades_then_expires() {
        let mid_fade = opacity_at(Duration::from_millis(3_150)).expect("should still be fading");
        assert!(mid_fade > 0.0 && mid_fade < 1.0);
        assert_eq!(opacity_at(Duration::from_millis(3_300)), None);
        assert_eq!(opacity_at(Duration::from_secs(10)), None);
    }

    #[test]
    fn notifications_stack_without_coalescing() {
        let mut notifier = Notifier::new();
        notifier.info("first");
        notifier.info("first");
        notifier.notify("second", Severity::Error);

        let toasts = notifier.toasts();
        assert_eq!(toasts.len(), 3);
        assert_eq!(toasts[0].message, "first");
        assert_eq!(toasts[1].message, "first");
        assert_eq!(toasts[2].severity, Severity::Error);
    }

    #[test]
    fn sweep_drops_only_expired_toasts() {
        let mut notifier = Notifier::new();
        notifier.info("fresh");
        notifier.sweep(Instant::now());
        assert_eq!(notifier.toasts().len(), 1);

        notifier.sweep(Instant::now() + DISPLAY_WINDOW + FADE_WINDOW);
        assert!(notifier.toasts().is_empty());
    }
}
