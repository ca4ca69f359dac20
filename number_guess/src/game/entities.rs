use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt};
use uuid::Uuid;

use super::constants;

/// Opaque player identity assigned by the server for the lifetime of a
/// connection (push) or a session (poll).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Generate a fresh id of the form `player_1a2b3c`.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!(
            "player_{}",
            &hex[..constants::PLAYER_ID_HEX_LENGTH]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Display name chosen by a player.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .take(constants::MAX_USERNAME_LENGTH)
            .collect();
        Self(username)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Phase of the current round.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    #[default]
    WaitingForPlayers,
    WaitingForNumbers,
    WaitingForGuesses,
    RoundOver,
}

impl RoundState {
    /// Every state except the lobby counts as a game in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::WaitingForPlayers)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::WaitingForPlayers => "WAITING_FOR_PLAYERS",
            Self::WaitingForNumbers => "WAITING_FOR_NUMBERS",
            Self::WaitingForGuesses => "WAITING_FOR_GUESSES",
            Self::RoundOver => "ROUND_OVER",
        };
        write!(f, "{repr}")
    }
}

/// A gameplay action sent by a client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    RaiseNumber { number: i64 },
    MakeGuess { guess: i64 },
    StartNewRound,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RaiseNumber { .. } => "raise_number",
            Self::MakeGuess { .. } => "make_guess",
            Self::StartNewRound => "start_new_round",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RaiseNumber { number } => write!(f, "raised {number}"),
            Self::MakeGuess { guess } => write!(f, "guessed {guess}"),
            Self::StartNewRound => write!(f, "started a new round"),
        }
    }
}

/// Per-player record owned by the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub username: Username,
    pub score: u32,
    pub raised_number: Option<u8>,
    pub guess: Option<i64>,
}

impl Player {
    pub fn new(username: Username) -> Self {
        Self {
            username,
            score: 0,
            raised_number: None,
            guess: None,
        }
    }

    /// Forget this round's raise and guess.
    pub fn clear_round(&mut self) {
        self.raised_number = None;
        self.guess = None;
    }

    /// Back to a freshly joined player.
    pub fn reset(&mut self) {
        self.score = 0;
        self.clear_round();
    }
}

/// A guess as shown to clients. Guesses stay hidden until the round is over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MaskedGuess {
    Hidden,
    Revealed(i64),
}

impl Serialize for MaskedGuess {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Hidden => serializer.serialize_str(constants::HIDDEN_GUESS_MARKER),
            Self::Revealed(guess) => serializer.serialize_i64(*guess),
        }
    }
}

impl<'de> Deserialize<'de> for MaskedGuess {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(i64),
            Marker(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Value(guess) => Ok(Self::Revealed(guess)),
            Repr::Marker(marker) if marker == constants::HIDDEN_GUESS_MARKER => Ok(Self::Hidden),
            Repr::Marker(marker) => Err(serde::de::Error::custom(format!(
                "unexpected guess marker {marker:?}"
            ))),
        }
    }
}

/// Public per-player fields of a snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub score: u32,
    pub raised_number: Option<u8>,
    pub guess: Option<MaskedGuess>,
}

/// Immutable copy of the whole game, safe to serialize and hand to any
/// number of readers.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub current_round: u32,
    pub round_state: RoundState,
    pub round_message: String,
    pub players: BTreeMap<PlayerId, PlayerView>,
    /// Only present once the round is over.
    pub actual_total: Option<u32>,
    pub required_players: usize,
    pub active_player_id: Option<PlayerId>,
    pub player_usernames: BTreeMap<PlayerId, Username>,
}
