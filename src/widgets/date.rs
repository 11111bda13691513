//! Clock/date widget: local time, refreshed every tick.

use anyhow::Result;
use chrono::Local;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

pub struct DateWidget {
    payload: Payload,
}

impl DateWidget {
    pub fn new() -> Self {
        Self {
            payload: Payload::new(),
        }
    }
}

impl Default for DateWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for DateWidget {
    fn name(&self) -> &str {
        "date"
    }

    fn update(&mut self) -> Result<()> {
        // U+2004 keeps the fields visually grouped with pango markup.
        let now = Local::now().format("%a\u{2004}%m/%d\u{2004}%H:%M:%S");
        self.payload.set(now.to_string(), Severity::Idle);
        Ok(())
    }

    fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::Polled { period: 1 }
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}
