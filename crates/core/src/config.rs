//! Fixed client configuration and persisted user preferences.
//!
//! The chat surface itself is deliberately not runtime-configurable: the
//! endpoint URL, prompt length limit, and auto-scroll threshold are compile
//! time constants. The only state that survives a restart is the theme
//! preference, stored as a small TOML file in the user config directory.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generation endpoint the client POSTs prompts to.
pub const ENDPOINT_URL: &str = "http://localhost:8000/api/generate";

/// Maximum prompt length in characters, enforced before a session starts.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// How close to the bottom (in lines) the view must be for auto-scroll to
/// keep following the stream.
pub const AUTOSCROLL_PROXIMITY: u16 = 3;

/// Notice shown when a generation is cancelled before any text arrived.
pub const GENERATION_STOPPED_NOTICE: &str = "Generation stopped.";

/// Theme preference persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    #[default]
    Dark,
}

impl ThemePreference {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(ThemePreference::Light),
            "dark" => Some(ThemePreference::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}

/// Persisted user preferences.
///
/// Stored under the fixed key `theme`; unknown keys in the file are ignored
/// so older files keep loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: ThemePreference,
}

impl Preferences {
    /// Default preferences file location: `<config dir>/rill/prefs.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(custom) = std::env::var("RILL_CONFIG_DIR") {
            return Ok(PathBuf::from(custom).join("prefs.toml"));
        }

        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
        Ok(base.join("rill").join("prefs.toml"))
    }

    /// Load preferences from `path`, falling back to defaults when the file
    /// is missing or unreadable. A malformed file is not fatal.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("malformed preferences file {}: {}", path.display(), e);
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        }
    }

    /// Write preferences to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string(self).map_err(|e| Error::Config(format!("serialize preferences: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default location.
    pub fn load() -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Preferences::default(),
        }
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }
}
