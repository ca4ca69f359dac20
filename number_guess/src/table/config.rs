//! Table configuration models.

use serde::{Deserialize, Serialize};

use crate::game::GameSettings;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name, used in logs
    pub name: String,

    /// Seats that must be filled before a round starts (default: 2)
    pub required_players: usize,

    /// Departures below this count reset the game (default: `required_players`)
    pub min_players: Option<usize>,

    /// Capacity of the actor's message inbox
    pub inbox_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            required_players: crate::game::constants::DEFAULT_REQUIRED_PLAYERS,
            min_players: None,
            inbox_capacity: 100,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be greater than 0".to_string());
        }

        self.game_settings().validate()
    }

    /// Engine settings derived from this table
    pub fn game_settings(&self) -> GameSettings {
        let settings = GameSettings::new(self.required_players);
        match self.min_players {
            Some(min_players) => settings.with_min_players(min_players),
            None => settings,
        }
    }
}
