//! Player configuration
//!
//! Stored as YAML in the user's config directory, default location
//! `~/.config/sharp9/config.yaml`. A missing or unparsable file falls back
//! to defaults with a warning; configuration problems never block startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub audio: AudioSection,
    pub practice: PracticeSection,
}

/// Audio device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Device buffer size in frames
    pub buffer_frames: u32,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self { buffer_frames: 512 }
    }
}

/// Practice-tool behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSection {
    /// Speed change per step command
    pub speed_step: f64,
    /// Pitch change per step command, in semitones
    pub pitch_step: f64,
    /// Waveform peak bucket count per track
    pub peak_buckets: usize,
}

impl Default for PracticeSection {
    fn default() -> Self {
        Self {
            speed_step: 0.05,
            pitch_step: 1.0,
            peak_buckets: 1000,
        }
    }
}

/// Default config file path: `~/.config/sharp9/config.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("sharp9")
        .join("config.yaml")
}

/// Load configuration, falling back to defaults on any problem
pub fn load_config(path: &Path) -> PlayerConfig {
    if !path.exists() {
        log::info!("no config at {:?}, using defaults", path);
        return PlayerConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<PlayerConfig>(&contents) {
            Ok(config) => {
                log::info!(
                    "loaded config: buffer {} frames, {} peak buckets",
                    config.audio.buffer_frames,
                    config.practice.peak_buckets
                );
                config
            }
            Err(e) => {
                log::warn!("failed to parse config: {}, using defaults", e);
                PlayerConfig::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read config file: {}, using defaults", e);
            PlayerConfig::default()
        }
    }
}

/// Save configuration, creating parent directories as needed
pub fn save_config(config: &PlayerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {:?}", parent))?;
    }
    let yaml = serde_yaml::to_string(config).context("failed to serialize config")?;
    std::fs::write(path, yaml).with_context(|| format!("failed to write config {:?}", path))?;
    Ok(())
}
