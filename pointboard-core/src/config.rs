/// Engine configuration.
/// Reads config.json from ~/.config/pointboard/config.json (or platform equivalent).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{
    BoardDefaults, DEFAULT_BG_COLOR_END, DEFAULT_BG_COLOR_START, DEFAULT_BOARD_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Where persisted keys live. Falls back to `default_data_dir()`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_board_name")]
    pub default_board_name: String,
    #[serde(default = "default_bg_color_start")]
    pub bg_color_start: String,
    #[serde(default = "default_bg_color_end")]
    pub bg_color_end: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_board_name() -> String {
    DEFAULT_BOARD_NAME.to_string()
}

fn default_bg_color_start() -> String {
    DEFAULT_BG_COLOR_START.to_string()
}

fn default_bg_color_end() -> String {
    DEFAULT_BG_COLOR_END.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: default_log_level(),
            default_board_name: default_board_name(),
            bg_color_start: default_bg_color_start(),
            bg_color_end: default_bg_color_end(),
        }
    }
}

impl EngineConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Defaults applied to newly created boards.
    pub fn board_defaults(&self) -> BoardDefaults {
        BoardDefaults {
            name: self.default_board_name.clone(),
            bg_color_start: self.bg_color_start.clone(),
            bg_color_end: self.bg_color_end.clone(),
        }
    }
}

/// Default config path: ~/.config/pointboard/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pointboard")
        .join("config.json")
}

/// Default data directory: ~/.local/share/pointboard
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pointboard")
}

/// Load config from path. Returns default if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[pointboard.config] Failed to parse config {}: {}", path.display(), e);
            EngineConfig::default()
        }),
        Err(_) => {
            log::info!("[pointboard.config] No config at {}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}
