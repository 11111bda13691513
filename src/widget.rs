//! The widget contract: the capability set every status unit implements.
//!
//! A widget produces a display payload, optionally exposes a wakeup handle,
//! optionally declares a polling period, and reacts to click events. The
//! reactor never looks inside a widget beyond this surface.

use std::os::unix::io::RawFd;
use std::time::Instant;

use anyhow::Result;

/// Categorical urgency of a widget's payload, mapped to a fixed i3bar color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    /// Resource unavailable or widget degraded.
    Inactive,
    Cool,
    Good,
    #[default]
    Idle,
    Warning,
    Critical,
}

impl Severity {
    /// Hex color string for the feed, matching the bar theme.
    pub fn color(self) -> &'static str {
        match self {
            Severity::Inactive => "#6A6862",
            Severity::Cool => "#729FCF",
            Severity::Good => "#98BC37",
            Severity::Idle => "#FCE8C3",
            Severity::Warning => "#FED06E",
            Severity::Critical => "#F75341",
        }
    }
}

/// How a widget wants to be woken up.
///
/// Widgets may switch between modes at any time by reporting a new value
/// from [`Widget::trigger_mode`]; the reactor observes the change after
/// every update and re-registers accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Never auto-updates. Only direct calls (clicks) reach the widget.
    #[default]
    Disabled,
    /// Update every `period` clock ticks. `period` must be > 0; a zero
    /// period is expressed as `Disabled` instead.
    Polled { period: u64 },
    /// Update when the widget-owned handle becomes readable. The widget
    /// keeps ownership of the fd; the core only indexes it.
    Event(RawFd),
}

/// Current display state of a widget: text, severity, and the monotonic
/// time of the last content change.
#[derive(Debug, Clone)]
pub struct Payload {
    text: String,
    severity: Severity,
    updated_at: Instant,
}

impl Default for Payload {
    fn default() -> Self {
        Self {
            text: String::new(),
            severity: Severity::Idle,
            updated_at: Instant::now(),
        }
    }
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed content. The timestamp moves only when the
    /// content actually changes.
    pub fn set(&mut self, text: impl Into<String>, severity: Severity) {
        let text = text.into();
        if text != self.text || severity != self.severity {
            self.text = text;
            self.severity = severity;
            self.updated_at = Instant::now();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Empty payloads are skipped by the feed encoder.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    /// Diagnostic check: has more wall time than `period` seconds passed
    /// since the last content change? The scheduler itself keys off the
    /// tick counter, never off this.
    pub fn needs_refresh(&self, period: u64) -> bool {
        period > 0 && self.updated_at.elapsed().as_secs() >= period
    }
}

/// An independently updatable status unit.
///
/// `init` runs exactly once when the widget is added to the reactor, before
/// its first update. `update` refreshes the payload and may change the
/// reported trigger mode as a side effect (an event-driven widget that lost
/// its resource falls back to polling, and vice versa). Errors from `update`
/// are caught at the dispatch site and demote the widget to a 1-second
/// polling retry; they never unwind into the reactor loop.
pub trait Widget {
    /// Unique name, used for lookup and click routing.
    fn name(&self) -> &str;

    /// One-time setup at registration.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Refresh the payload from the underlying resource.
    fn update(&mut self) -> Result<()>;

    /// React to a click. `button` is the i3bar button code; its meaning is
    /// widget-specific. May call `update` internally.
    fn handle_click(&mut self, _button: u64) {}

    /// The wakeup arrangement the widget currently wants.
    fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::Disabled
    }

    /// Current display state.
    fn payload(&self) -> &Payload;

    /// Widgets may flag themselves for removal; the registry sweep honors
    /// this between dispatch batches.
    fn should_remove(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn severity_colors_match_theme() {
        assert_eq!(Severity::Inactive.color(), "#6A6862");
        assert_eq!(Severity::Cool.color(), "#729FCF");
        assert_eq!(Severity::Good.color(), "#98BC37");
        assert_eq!(Severity::Idle.color(), "#FCE8C3");
        assert_eq!(Severity::Warning.color(), "#FED06E");
        assert_eq!(Severity::Critical.color(), "#F75341");
    }

    #[test]
    fn payload_timestamp_moves_only_on_change() {
        let mut p = Payload::new();
        p.set("50%", Severity::Idle);
        let first = p.updated_at();

        std::thread::sleep(Duration::from_millis(5));
        p.set("50%", Severity::Idle);
        assert_eq!(p.updated_at(), first, "unchanged content must not bump the timestamp");

        std::thread::sleep(Duration::from_millis(5));
        p.set("51%", Severity::Idle);
        assert!(p.updated_at() > first);
    }

    #[test]
    fn payload_severity_change_counts_as_change() {
        let mut p = Payload::new();
        p.set("x", Severity::Idle);
        let first = p.updated_at();
        std::thread::sleep(Duration::from_millis(5));
        p.set("x", Severity::Critical);
        assert!(p.updated_at() > first);
    }

    #[test]
    fn needs_refresh_disabled_for_zero_period() {
        let p = Payload::new();
        assert!(!p.needs_refresh(0));
    }
}
