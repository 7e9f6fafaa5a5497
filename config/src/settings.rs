//! Application settings

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Upper bound of the reasoning budget accepted by the default model
pub const DEFAULT_THINKING_BUDGET: i32 = 32768;

/// Defaults read from settings.toml. Command-line flags override every field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Gemini model identifier (e.g., "gemini-2.5-flash")
    pub model: Option<String>,
    /// Reasoning budget sent with every analysis request
    pub thinking_budget: Option<i32>,
    /// Alternate Gemini endpoint (e.g., a proxy)
    pub gemini_base_url: Option<String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        match PathManager::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn thinking_budget(&self) -> i32 {
        self.thinking_budget.unwrap_or(DEFAULT_THINKING_BUDGET)
    }
}
