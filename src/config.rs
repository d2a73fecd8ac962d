use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use thiserror::Error;

use crate::oracle_types::Difficulty;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("difficulty level {0} is outside 1-10")]
    DifficultyOutOfRange(u8),
    #[error("suggestion timeout must be positive")]
    ZeroTimeout,
}

/// Who plays the side the human is not playing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpponentKind {
    /// Both sides are entered through `attempt_move`.
    Human,
    /// The other side is played by a suggestion oracle.
    #[default]
    Oracle,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(with = "crate::chess_serde::color_serde")]
    pub human_color: Color,
    pub opponent: OpponentKind,
    pub difficulty: Difficulty,
    /// Upper bound on one oracle request.
    pub suggestion_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            human_color: Color::White,
            opponent: OpponentKind::Oracle,
            difficulty: Difficulty::default(),
            suggestion_timeout_ms: 10_000,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Difficulty::Level(level) = self.difficulty {
            if !self.difficulty.is_valid() {
                return Err(ConfigError::DifficultyOutOfRange(level));
            }
        }
        if self.suggestion_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_millis(self.suggestion_timeout_ms)
    }

    pub fn against_human() -> Self {
        Self {
            opponent: OpponentKind::Human,
            ..Self::default()
        }
    }

    pub fn playing(mut self, color: Color) -> Self {
        self.human_color = color;
        self
    }
}
