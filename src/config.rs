//! Runtime configuration: which widgets run, in bar order.
//!
//! Loaded from `$XDG_CONFIG_HOME/barfeed/config.toml` (falling back to
//! `~/.config`), with a full default roster when no file exists. A broken
//! or partial file is not fatal; the defaults fill in.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Widget names in registry (= display) order.
    pub widgets: Vec<String>,
    /// Battery supply name under /sys/class/power_supply.
    pub battery: String,
    /// Backlight device name under /sys/class/backlight.
    pub backlight: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            widgets: [
                "battery",
                "backlight",
                "network",
                "memory",
                "cpu",
                "temp",
                "date",
            ]
            .map(String::from)
            .to_vec(),
            battery: "BAT0".into(),
            backlight: "intel_backlight".into(),
        }
    }
}

impl Config {
    /// Load the user config, or defaults when the file is absent.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            debug!("no config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    fn load_from(path: &PathBuf) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).context("failed to parse config")
    }

    fn path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("barfeed").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_list_every_widget() {
        let config = Config::default();
        assert_eq!(config.widgets.first().map(String::as_str), Some("battery"));
        assert_eq!(config.widgets.last().map(String::as_str), Some("date"));
        assert_eq!(config.battery, "BAT0");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("widgets = [\"date\"]\n").unwrap();
        assert_eq!(config.widgets, ["date"]);
        assert_eq!(config.backlight, "intel_backlight");
    }

    #[test]
    fn full_toml_round_trips() {
        let config: Config = toml::from_str(
            "widgets = [\"cpu\", \"date\"]\nbattery = \"BAT1\"\nbacklight = \"amdgpu_bl1\"\n",
        )
        .unwrap();
        assert_eq!(config.widgets, ["cpu", "date"]);
        assert_eq!(config.battery, "BAT1");
        assert_eq!(config.backlight, "amdgpu_bl1");
    }
}
