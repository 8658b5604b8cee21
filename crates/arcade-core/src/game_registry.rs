use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::game_trait::GameMetadata;

/// Identifier of a registered game type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    CircularPong,
    Runner,
}

impl GameKind {
    pub const ALL: [GameKind; 2] = [GameKind::CircularPong, GameKind::Runner];

    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::CircularPong => "circular_pong",
            GameKind::Runner => "runner",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circular_pong" | "circular-pong" | "pong" => Ok(GameKind::CircularPong),
            "runner" | "lane_runner" | "lane-runner" => Ok(GameKind::Runner),
            other => Err(ConfigurationError::UnknownGameKind(other.to_string())),
        }
    }
}

/// A registered game entry in the game catalog.
#[derive(Debug, Clone)]
pub struct GameEntry {
    pub kind: GameKind,
    pub metadata: GameMetadata,
}
