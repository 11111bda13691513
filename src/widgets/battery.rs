//! Battery widget: sysfs power_supply capacity and charge state.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const DEGRADED: &str = "\u{f1834}";
const CHARGING: &str = "\u{f0084}";
const DISCHARGING: [&str; 5] = [
    "\u{f008e}", "\u{f007b}", "\u{f007d}", "\u{f007f}", "\u{f0079}",
];

pub struct BatteryWidget {
    supply_dir: PathBuf,
    payload: Payload,
}

impl BatteryWidget {
    pub fn new(supply: &str) -> Self {
        Self {
            supply_dir: PathBuf::from("/sys/class/power_supply").join(supply),
            payload: Payload::new(),
        }
    }

    fn read_attr(&self, attr: &str) -> Result<String> {
        let path = self.supply_dir.join(attr);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(text.trim().to_owned())
    }

    fn glyph(capacity: u64, charging: bool) -> &'static str {
        if charging {
            return CHARGING;
        }
        let idx = ((capacity as usize * DISCHARGING.len()) / 101).min(DISCHARGING.len() - 1);
        DISCHARGING[idx]
    }

    fn severity(capacity: u64, charging: bool) -> Severity {
        if charging {
            Severity::Good
        } else if capacity <= 15 {
            Severity::Critical
        } else if capacity <= 30 {
            Severity::Warning
        } else {
            Severity::Idle
        }
    }
}

impl Widget for BatteryWidget {
    fn name(&self) -> &str {
        "battery"
    }

    fn update(&mut self) -> Result<()> {
        let capacity: u64 = match self
            .read_attr("capacity")
            .and_then(|text| text.parse().context("capacity is not a number"))
        {
            Ok(value) => value,
            Err(err) => {
                // Supply gone (dock removed, module unloaded): show the
                // degraded glyph and let the dispatch site demote us to the
                // 1-second retry.
                self.payload.set(DEGRADED, Severity::Inactive);
                return Err(err);
            }
        };
        let status = self.read_attr("status").unwrap_or_default();
        let charging = status == "Charging" || status == "Full";

        let text = format!("{}\u{2004}{capacity}%", Self::glyph(capacity, charging));
        self.payload.set(text, Self::severity(capacity, charging));
        Ok(())
    }

    fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::Polled { period: 5 }
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}
