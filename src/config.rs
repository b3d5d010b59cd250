use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colorchords::audio::ToneShape;
use colorchords::game::{AnswerPreset, RoundTimings};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub answers: Option<AnswerPreset>,
    #[serde(default = "default_reveal_ms")]
    pub reveal_ms: u64,
    #[serde(default = "default_next_round_ms")]
    pub next_round_ms: u64,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_tone_ms")]
    pub tone_ms: u64,
    #[serde(default = "default_tone_gain")]
    pub tone_gain: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            answers: None,
            reveal_ms: default_reveal_ms(),
            next_round_ms: default_next_round_ms(),
            fps: default_fps(),
            seed: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            tone_ms: default_tone_ms(),
            tone_gain: default_tone_gain(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl GameConfig {
    pub fn timings(&self) -> RoundTimings {
        RoundTimings {
            reveal: Duration::from_millis(self.reveal_ms),
            next_round: Duration::from_millis(self.next_round_ms),
        }
    }
}

impl AudioConfig {
    pub fn tone_shape(&self) -> ToneShape {
        ToneShape {
            sample_rate: self.sample_rate,
            duration: Duration::from_millis(self.tone_ms),
            gain: self.tone_gain,
            ..ToneShape::default()
        }
    }
}

fn default_reveal_ms() -> u64 { 1000 }
fn default_next_round_ms() -> u64 { 2000 }
fn default_fps() -> u32 { 30 }
fn default_smoothing() -> f32 { 0.6 }
fn default_tone_ms() -> u64 { 1000 }
fn default_tone_gain() -> f32 { 0.3 }
fn default_sample_rate() -> u32 { 44_100 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::debug!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.game.reveal_ms, 1000);
        assert_eq!(config.game.next_round_ms, 2000);
        assert_eq!(config.game.answers, None);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [game]
            answers = "swatches"
            reveal_ms = 750

            [audio]
            tone_gain = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.game.answers, Some(AnswerPreset::Swatches));
        assert_eq!(config.game.timings().reveal, Duration::from_millis(750));
        assert_eq!(config.game.timings().next_round, Duration::from_millis(2000));
        let shape = config.audio.tone_shape();
        assert_eq!(shape.gain, 0.5);
        assert_eq!(shape.duration, Duration::from_millis(1000));
    }

    #[test]
    fn unreadable_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colorchords.toml");
        std::fs::write(&path, "[game\nreveal_ms = ").unwrap();
        assert!(load_config(&path).is_none());
        assert!(load_config(&dir.path().join("missing.toml")).is_none());
    }
}
