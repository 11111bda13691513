//! Network widget: primary interface with rx/tx rates.
//!
//! The primary interface is picked by name prefix (wired `en*`/`eth*`,
//! wireless `wl*`), matching how the bar's host machine names devices.

use anyhow::Result;
use sysinfo::Networks;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const NO_LINK: &str = "\u{f1787}";
const WIRED: &str = "\u{f0200}";
const WIRELESS: &str = "\u{f05a9}";

pub struct NetworkWidget {
    networks: Networks,
    payload: Payload,
    show_name: bool,
}

impl NetworkWidget {
    pub fn new() -> Self {
        Self {
            networks: Networks::new(),
            payload: Payload::new(),
            show_name: false,
        }
    }

    fn format_rate(bytes_per_sec: u64) -> String {
        if bytes_per_sec >= 1_000_000 {
            format!("{:.1}M", bytes_per_sec as f64 / 1_048_576.0)
        } else {
            format!("{}K", bytes_per_sec / 1024)
        }
    }
}

impl Default for NetworkWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for NetworkWidget {
    fn name(&self) -> &str {
        "network"
    }

    fn update(&mut self) -> Result<()> {
        self.networks.refresh(true);

        // `received`/`transmitted` are deltas since the previous refresh,
        // which at a 1-tick period makes them per-second rates.
        let primary = self
            .networks
            .iter()
            .filter(|(name, _)| name.starts_with("en") || name.starts_with("eth") || name.starts_with("wl"))
            .max_by_key(|(_, data)| data.total_received());

        match primary {
            Some((name, data)) => {
                let icon = if name.starts_with("wl") { WIRELESS } else { WIRED };
                let rates = format!(
                    "{}\u{2004}{}\u{2004}{}",
                    icon,
                    Self::format_rate(data.received()),
                    Self::format_rate(data.transmitted()),
                );
                let text = if self.show_name {
                    format!("{rates}\u{2004}{name}")
                } else {
                    rates
                };
                self.payload.set(text, Severity::Idle);
            }
            None => self.payload.set(NO_LINK, Severity::Inactive),
        }
        Ok(())
    }

    fn handle_click(&mut self, button: u64) {
        if button == 3 {
            self.show_name = !self.show_name;
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
