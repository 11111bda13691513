//! Backlight widget: event-driven via an inotify watch on the sysfs
//! brightness attribute.
//!
//! This is the widget that exercises dynamic trigger-mode transitions. While
//! the watch is healthy it reports `Event(fd)` and there is no periodic
//! fallback; when the watch cannot be established (device absent, module
//! unloaded) it reports `Polled { period: 1 }` and every poll retries both
//! the read and the watch, promoting itself back to event-driven once the
//! attribute reappears.

use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use anyhow::{Context, Result};
use inotify::{Inotify, WatchMask};
use tracing::debug;

use crate::widget::{Payload, Severity, TriggerMode, Widget};

const DEGRADED: &str = "\u{f00e0}";
const ICONS: [&str; 3] = ["\u{f00de}", "\u{f00df}", "\u{f00e0}"];

pub struct BacklightWidget {
    device_dir: PathBuf,
    inotify: Option<Inotify>,
    payload: Payload,
}

impl BacklightWidget {
    pub fn new(device: &str) -> Self {
        Self {
            device_dir: PathBuf::from("/sys/class/backlight").join(device),
            inotify: None,
            payload: Payload::new(),
        }
    }

    fn brightness_path(&self) -> PathBuf {
        self.device_dir.join("brightness")
    }

    fn read_attr(&self, attr: &str) -> Result<u64> {
        let path = self.device_dir.join(attr);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        text.trim()
            .parse()
            .with_context(|| format!("{} is not a number", path.display()))
    }

    /// (Re-)establish the inotify watch on the brightness attribute.
    fn establish_watch(&mut self) -> Result<()> {
        let inotify = Inotify::init().context("failed to init inotify")?;
        inotify
            .watches()
            .add(self.brightness_path(), WatchMask::MODIFY)
            .with_context(|| format!("failed to watch {}", self.brightness_path().display()))?;
        debug!(fd = inotify.as_raw_fd(), "backlight watch established");
        self.inotify = Some(inotify);
        Ok(())
    }

    /// Drain queued watch events; their content is irrelevant, the wakeup is
    /// the signal.
    fn drain_events(&mut self) {
        if let Some(inotify) = self.inotify.as_mut() {
            let mut buf = [0u8; 1024];
            let _ = inotify.read_events(&mut buf);
        }
    }

    fn render(&mut self) -> Result<()> {
        let brightness = self.read_attr("brightness")?;
        let max = self.read_attr("max_brightness")?.max(1);
        let percent = brightness * 100 / max;

        let idx = ((percent as usize * ICONS.len()) / 101).min(ICONS.len() - 1);
        self.payload
            .set(format!("{}\u{2004}{percent}%", ICONS[idx]), Severity::Idle);
        Ok(())
    }
}

impl Widget for BacklightWidget {
    fn name(&self) -> &str {
        "backlight"
    }

    fn init(&mut self) -> Result<()> {
        self.establish_watch()
    }

    fn update(&mut self) -> Result<()> {
        self.drain_events();

        if self.inotify.is_none() {
            // Polling fallback: retry the watch first so a successful read
            // below promotes us straight back to event-driven.
            if let Err(err) = self.establish_watch() {
                debug!(error = %err, "backlight watch still unavailable");
            }
        }

        match self.render() {
            Ok(()) => Ok(()),
            Err(err) => {
                // Attribute unreadable: the watch (if any) is stale too.
                self.inotify = None;
                self.payload.set(DEGRADED, Severity::Inactive);
                Err(err)
            }
        }
    }

    fn trigger_mode(&self) -> TriggerMode {
        match &self.inotify {
            Some(inotify) => TriggerMode::Event(inotify.as_raw_fd()),
            None => TriggerMode::Polled { period: 1 },
        }
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(brightness: &str, max: &str) -> (tempfile::TempDir, BacklightWidget) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("brightness"), brightness).unwrap();
        std::fs::write(dir.path().join("max_brightness"), max).unwrap();
        let widget = BacklightWidget {
            device_dir: dir.path().to_owned(),
            inotify: None,
            payload: Payload::new(),
        };
        (dir, widget)
    }

    #[test]
    fn healthy_device_promotes_to_event_driven() {
        let (_dir, mut widget) = fixture("512\n", "1024\n");
        widget.update().unwrap();
        assert!(widget.payload().text().contains("50%"));
        assert!(
            matches!(widget.trigger_mode(), TriggerMode::Event(_)),
            "watch established, no periodic fallback"
        );
    }

    #[test]
    fn missing_device_falls_back_to_polling() {
        let mut widget = BacklightWidget::new("no-such-device");
        assert!(widget.update().is_err());
        assert_eq!(widget.payload().text(), DEGRADED);
        assert_eq!(widget.payload().severity(), Severity::Inactive);
        assert_eq!(widget.trigger_mode(), TriggerMode::Polled { period: 1 });
    }

    #[test]
    fn device_reappearing_restores_event_mode() {
        let (dir, mut widget) = fixture("300\n", "1000\n");
        widget.update().unwrap();
        assert!(matches!(widget.trigger_mode(), TriggerMode::Event(_)));

        // Device vanishes: demoted to polling with the degraded payload.
        std::fs::remove_file(dir.path().join("brightness")).unwrap();
        assert!(widget.update().is_err());
        assert_eq!(widget.trigger_mode(), TriggerMode::Polled { period: 1 });

        // Device returns: the next poll re-establishes the watch.
        std::fs::write(dir.path().join("brightness"), "700\n").unwrap();
        widget.update().unwrap();
        assert!(widget.payload().text().contains("70%"));
        assert!(matches!(widget.trigger_mode(), TriggerMode::Event(_)));
    }
}
