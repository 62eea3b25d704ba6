use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inputs::chord::DEFAULT_TOGGLE_SEQUENCE;
use crate::layout::DEFAULT_WIDTH;

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "gridreader";

/// Values from the optional config file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Skip blank rows when drawing.
    #[serde(default)]
    pub compact: bool,

    /// Start with the global hook switched on.
    #[serde(default)]
    pub global_hook: bool,

    #[serde(default = "default_layout_width")]
    pub layout_width: usize,

    /// Digits typed while Ctrl is held to toggle the global hook.
    #[serde(default = "default_toggle_sequence")]
    pub toggle_sequence: String,

    /// How long status messages stay on screen.
    #[serde(default = "default_message_millis")]
    pub message_millis: u64,
}

fn default_layout_width() -> usize {
    DEFAULT_WIDTH
}

fn default_toggle_sequence() -> String {
    DEFAULT_TOGGLE_SEQUENCE.to_string()
}

fn default_message_millis() -> u64 {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compact: false,
            global_hook: false,
            layout_width: default_layout_width(),
            toggle_sequence: default_toggle_sequence(),
            message_millis: default_message_millis(),
        }
    }
}

/// Command line overrides, already parsed.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub compact: bool,
    pub global_hook: bool,
    pub layout_width: Option<usize>,
}

impl Settings {
    pub fn message_pause(&self) -> Duration {
        Duration::from_millis(self.message_millis)
    }

    /// Flags can only switch features on; an explicit width replaces the
    /// configured one.
    pub fn apply(mut self, overrides: &Overrides) -> Self {
        self.compact |= overrides.compact;
        self.global_hook |= overrides.global_hook;
        if let Some(width) = overrides.layout_width {
            self.layout_width = width;
        }
        if self.toggle_sequence.is_empty() {
            self.toggle_sequence = default_toggle_sequence();
        }
        self
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Loads the config file if there is one. Any problem falls back to defaults.
pub fn load_settings() -> Settings {
    match config_path() {
        Some(path) if path.exists() => load_settings_from_path(&path),
        Some(path) => {
            debug!("No settings file at {path:?}, using defaults");
            Settings::default()
        }
        None => {
            info!("Could not determine config directory, using default settings");
            Settings::default()
        }
    }
}

pub fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {path:?}: {settings:?}");
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}
