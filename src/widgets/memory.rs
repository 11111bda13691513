//! Memory widget: used memory in binary units, percentage detail on right
//! click.

use anyhow::{Result, ensure};
use sysinfo::System;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const ICON: &str = "\u{f035b}";

pub struct MemoryWidget {
    system: System,
    payload: Payload,
    show_percent: bool,
}

impl MemoryWidget {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            payload: Payload::new(),
            show_percent: false,
        }
    }

    fn severity(percent: f64) -> Severity {
        if percent >= 80.0 {
            Severity::Critical
        } else if percent >= 50.0 {
            Severity::Warning
        } else {
            Severity::Idle
        }
    }

    /// Format a byte count starting at KiB, tightening precision as the
    /// mantissa grows.
    fn format_bytes(bytes: f64) -> String {
        const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
        let mut value = bytes / 1024.0;
        let mut unit = 0;
        while value >= 1000.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if value >= 100.0 {
            format!("{value:.0}{}", UNITS[unit])
        } else if value >= 10.0 {
            format!("{value:.1}{}", UNITS[unit])
        } else {
            format!("{value:.2}{}", UNITS[unit])
        }
    }
}

impl Default for MemoryWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for MemoryWidget {
    fn name(&self) -> &str {
        "memory"
    }

    fn update(&mut self) -> Result<()> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        ensure!(total > 0, "no memory totals reported");
        let used = total.saturating_sub(self.system.available_memory());
        let percent = used as f64 / total as f64 * 100.0;

        let text = if self.show_percent {
            format!("{ICON}\u{2004}{percent:.0}%")
        } else {
            format!("{ICON}\u{2004}{}", Self::format_bytes(used as f64))
        };
        self.payload.set(text, Self::severity(percent));
        Ok(())
    }

    fn handle_click(&mut self, button: u64) {
        if button == 3 {
            self.show_percent = !self.show_percent;
            let _ = self.update();
        }
    }

    fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::Polled { period: 2 }
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_unit_formatting() {
        assert_eq!(MemoryWidget::format_bytes(512.0 * 1024.0), "512K");
        assert_eq!(MemoryWidget::format_bytes(4.5 * 1024.0 * 1024.0 * 1024.0), "4.50G");
        assert_eq!(MemoryWidget::format_bytes(24.0 * 1024.0 * 1024.0 * 1024.0), "24.0G");
    }

    #[test]
    fn severity_ladder() {
        assert_eq!(MemoryWidget::severity(10.0), Severity::Idle);
        assert_eq!(MemoryWidget::severity(55.0), Severity::Warning);
        assert_eq!(MemoryWidget::severity(90.0), Severity::Critical);
    }

    #[test]
    fn polls_every_other_tick() {
        assert_eq!(
            MemoryWidget::new().trigger_mode(),
            TriggerMode::Polled { period: 2 }
        );
    }
}
