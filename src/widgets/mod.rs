//! Leaf widget implementations behind the widget contract.
//!
//! Everything here is swappable business logic: the reactor only ever sees
//! the `Widget` trait surface.

mod backlight;
mod battery;
mod cpu;
mod date;
mod memory;
mod network;
mod temp;

pub use backlight::BacklightWidget;
pub use battery::BatteryWidget;
pub use cpu::CpuWidget;
pub use date::DateWidget;
pub use memory::MemoryWidget;
pub use network::NetworkWidget;
pub use temp::TempWidget;

use crate::config::Config;
use crate::widget::Widget;

/// Create a widget by config name. Returns `None` for unknown names.
pub fn create(name: &str, config: &Config) -> Option<Box<dyn Widget>> {
    match name {
        "backlight" => Some(Box::new(BacklightWidget::new(&config.backlight))),
        "battery" => Some(Box::new(BatteryWidget::new(&config.battery))),
        "cpu" => Some(Box::new(CpuWidget::new())),
        "date" => Some(Box::new(DateWidget::new())),
        "memory" => Some(Box::new(MemoryWidget::new())),
        "network" => Some(Box::new(NetworkWidget::new())),
        "temp" => Some(Box::new(TempWidget::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_every_default_widget() {
        let config = Config::default();
        for name in &config.widgets {
            assert!(create(name, &config).is_some(), "missing factory for {name}");
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(create("quux", &Config::default()).is_none());
    }
}
