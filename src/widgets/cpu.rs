//! CPU widget: global usage percentage, with a frequency detail mode on
//! right click.

use anyhow::Result;
use sysinfo::System;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const ICONS: [&str; 3] = ["\u{f0f86}", "\u{f0f85}", "\u{f04c5}"];

pub struct CpuWidget {
    system: System,
    payload: Payload,
    show_frequency: bool,
}

impl CpuWidget {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            payload: Payload::new(),
            show_frequency: false,
        }
    }

    fn severity(usage: f32) -> Severity {
        if usage >= 60.0 {
            Severity::Critical
        } else if usage >= 30.0 {
            Severity::Warning
        } else {
            Severity::Idle
        }
    }
}

impl Default for CpuWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for CpuWidget {
    fn name(&self) -> &str {
        "cpu"
    }

    fn update(&mut self) -> Result<()> {
        self.system.refresh_cpu_all();
        let usage = self.system.global_cpu_usage();

        let icon_idx = ((ICONS.len() as f32 * usage / 101.0) as usize).min(ICONS.len() - 1);
        let text = if self.show_frequency {
            let mhz = self
                .system
                .cpus()
                .iter()
                .map(|cpu| cpu.frequency())
                .max()
                .unwrap_or(0);
            format!("{} {:.2}GHz", ICONS[icon_idx], mhz as f64 / 1000.0)
        } else if usage < 10.0 {
            format!("{} {usage:.2}%", ICONS[icon_idx])
        } else {
            format!("{} {usage:.1}%", ICONS[icon_idx])
        };

        self.payload.set(text, Self::severity(usage));
        Ok(())
    }

    fn handle_click(&mut self, button: u64) {
        // Right click toggles between usage and frequency.
        if button == 3 {
            self.show_frequency = !self.show_frequency;
            let _ = self.update();
        }
    }

    fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::Polled { period: 1 }
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ladder() {
        assert_eq!(CpuWidget::severity(5.0), Severity::Idle);
        assert_eq!(CpuWidget::severity(30.0), Severity::Warning);
        assert_eq!(CpuWidget::severity(75.0), Severity::Critical);
    }

    #[test]
    fn right_click_toggles_mode() {
        let mut widget = CpuWidget::new();
        assert!(!widget.show_frequency);
        widget.handle_click(3);
        assert!(widget.show_frequency);
        widget.handle_click(1);
        assert!(widget.show_frequency, "only button 3 toggles");
    }

    #[test]
    fn update_emits_payload() {
        let mut widget = CpuWidget::new();
        widget.update().unwrap();
        assert!(!widget.payload().is_empty());
    }
}
