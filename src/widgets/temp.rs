//! Temperature widget: hottest CPU-adjacent sensor reported by sysinfo.

use anyhow::Result;
use sysinfo::Components;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const DEGRADED: &str = "\u{f2c7}\u{2004}--.-";

pub struct TempWidget {
    components: Components,
    payload: Payload,
}

impl TempWidget {
    pub fn new() -> Self {
        Self {
            components: Components::new(),
            payload: Payload::new(),
        }
    }

    fn severity(temp: f32) -> Severity {
        if temp >= 80.0 {
            Severity::Critical
        } else if temp >= 60.0 {
            Severity::Warning
        } else if temp >= 30.0 {
            Severity::Idle
        } else {
            Severity::Cool
        }
    }

    fn icon(temp: f32) -> &'static str {
        match temp {
            t if t >= 80.0 => "\u{f2c7}",
            t if t >= 60.0 => "\u{f2c8}",
            t if t >= 40.0 => "\u{f2c9}",
            t if t >= 20.0 => "\u{f2ca}",
            _ => "\u{f2cb}",
        }
    }

    fn cpu_temperature(&self) -> Option<f32> {
        self.components
            .iter()
            .filter(|c| {
                let label = c.label().to_lowercase();
                label.contains("coretemp")
                    || label.contains("k10temp")
                    || label.contains("cpu")
                    || label.contains("package")
            })
            .filter_map(|c| c.temperature())
            .max_by(f32::total_cmp)
    }
}

impl Default for TempWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for TempWidget {
    fn name(&self) -> &str {
        "temp"
    }

    fn update(&mut self) -> Result<()> {
        self.components.refresh(true);
        match self.cpu_temperature() {
            Some(temp) => {
                let text = format!("{}\u{2004}{temp:.1}", Self::icon(temp));
                self.payload.set(text, Self::severity(temp));
            }
            None => {
                // No matching sensor on this machine; not an error worth a
                // retry demotion, just show the degraded glyph.
                self.payload.set(DEGRADED, Severity::Inactive);
            }
        }
        Ok(())
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
        assert_eq!(TempWidget::severity(20.0), Severity::Cool);
        assert_eq!(TempWidget::severity(45.0), Severity::Idle);
        assert_eq!(TempWidget::severity(65.0), Severity::Warning);
        assert_eq!(TempWidget::severity(85.0), Severity::Critical);
    }

    #[test]
    fn update_always_produces_output() {
        let mut widget = TempWidget::new();
        widget.update().unwrap();
        assert!(!widget.payload().is_empty());
    }
}
