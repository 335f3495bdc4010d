//! Game configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes: `{"starting_life": 40}` is a complete config.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_life: i32,
    pub opening_hand_size: u32,
    pub max_hand_size: u32,
    pub lands_per_turn: u32,
    /// Poison counters at which a player loses
    pub poison_threshold: u32,
    /// The starting player skips the draw on the first turn
    pub skip_first_draw: bool,
    /// Seed for library shuffles
    pub seed: u64,
    /// Snapshots a session keeps for rollback
    pub history_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            starting_life: 20,
            opening_hand_size: 7,
            max_hand_size: 7,
            lands_per_turn: 1,
            poison_threshold: 10,
            skip_first_draw: true,
            seed: 0,
            history_limit: 64,
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
