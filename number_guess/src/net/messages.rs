use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::entities::{GameSnapshot, PlayerId, Username};

/// First line a push client sends.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClientHello {
    #[serde(default)]
    pub username: Option<String>,
}

impl ClientHello {
    pub fn new(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
        }
    }

    /// Normalized username, or `None` when absent or blank.
    pub fn username(&self) -> Option<Username> {
        self.username
            .as_deref()
            .map(Username::new)
            .filter(|username| !username.is_empty())
    }
}

/// Every line the push server sends.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { player_id: PlayerId },
    GameState { data: GameSnapshot },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { player_id } => write!(f, "welcome {player_id}"),
            Self::GameState { data } => write!(
                f,
                "game state (round {}, {})",
                data.current_round, data.round_state
            ),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// `POST /connect` body.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub username: Option<String>,
}

/// `POST /connect` success body.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectResponse {
    pub player_id: PlayerId,
    pub message: String,
}

/// Body of the poll endpoints that only acknowledge.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body of every poll error response.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
