// Configuration management
//
// Handles emulator configuration and settings persistence across runs:
// window scale, vsync, target fps, audio buffer sizing, and key bindings.

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "gba-rs")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("gba-rs-config.toml"))
}

/// Video settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Window scale factor (1-8).
    pub scale: u32,
    /// Enable VSync.
    pub vsync: bool,
    /// Target frames per second (the real hardware runs at ~59.7275).
    pub target_fps: f64,
}

/// Audio settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub enabled: bool,
    pub sample_rate: u32,
    pub buffer_size: usize,
}

/// Keyboard-to-keypad bindings, stored as winit key names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub a: String,
    pub b: String,
    pub start: String,
    pub select: String,
    pub l: String,
    pub r: String,
}

/// Top-level emulator configuration, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub keys: KeyBindings,
    /// Path to the GBA BIOS image, if the user supplies one.
    pub bios_path: Option<PathBuf>,
    /// Most recently loaded ROMs, newest first.
    pub recent_roms: Vec<PathBuf>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            video: VideoConfig {
                scale: 2,
                vsync: true,
                target_fps: 59.7275,
            },
            audio: AudioConfig {
                enabled: true,
                sample_rate: 32_768,
                buffer_size: 2048,
            },
            keys: KeyBindings {
                up: "ArrowUp".to_string(),
                down: "ArrowDown".to_string(),
                left: "ArrowLeft".to_string(),
                right: "ArrowRight".to_string(),
                a: "KeyX".to_string(),
                b: "KeyZ".to_string(),
                start: "Enter".to_string(),
                select: "Backspace".to_string(),
                l: "KeyA".to_string(),
                r: "KeyS".to_string(),
            },
            bios_path: None,
            recent_roms: Vec::new(),
        }
    }
}

impl EmulatorConfig {
    /// Load from the platform config directory, falling back to defaults
    /// (and logging a warning) if the file is missing or unparsable.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                log::warn!("using default configuration: {err}");
                Self::default()
            }
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents).map_err(|source| ConfigError::Write { path, source })
    }

    pub fn push_recent_rom(&mut self, path: PathBuf) {
        self.recent_roms.retain(|p| p != &path);
        self.recent_roms.insert(0, path);
        self.recent_roms.truncate(10);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_native_frame_rate() {
        let config = EmulatorConfig::default();
        assert!((config.video.target_fps - 59.7275).abs() < 0.001);
        assert_eq!(config.audio.sample_rate, 32_768);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = EmulatorConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let restored: EmulatorConfig = toml::from_str(&text).expect("deserialize");
        assert_eq!(restored.video.scale, config.video.scale);
        assert_eq!(restored.keys.a, config.keys.a);
    }

    #[test]
    fn push_recent_rom_dedups_and_caps_at_ten() {
        let mut config = EmulatorConfig::default();
        for i in 0..12 {
            config.push_recent_rom(PathBuf::from(format!("rom{i}.gba")));
        }
        assert_eq!(config.recent_roms.len(), 10);
        assert_eq!(config.recent_roms[0], PathBuf::from("rom11.gba"));

        config.push_recent_rom(PathBuf::from("rom11.gba"));
        assert_eq!(config.recent_roms[0], PathBuf::from("rom11.gba"));
        assert_eq!(config.recent_roms.len(), 10, "re-pushing an existing entry must not grow the list");
    }
}
