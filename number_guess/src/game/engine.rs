//! Round state machine for the number guessing game.
//!
//! Each round every player, in turn order, raises a 1 or a 2. Once everyone
//! has raised, a single designated guesser tries to name the sum of all
//! raised numbers and scores a point on a hit. The guesser role rotates
//! through the turn order by one seat per round while the raising order
//! always starts from the first seat.
//!
//! [`GameEngine`] itself is a plain synchronous value. Exclusive access is
//! provided by the table actor that owns it, so each public method below runs
//! as one atomic unit.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{
    constants::{DEFAULT_REQUIRED_PLAYERS, MAX_REQUIRED_PLAYERS, RAISE_CHOICES},
    entities::{
        Action, GameSnapshot, MaskedGuess, Player, PlayerId, PlayerView, RoundState, Username,
    },
    errors::UserError,
};

/// Game configuration settings
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSettings {
    /// Seats at the table; a round starts once all are taken.
    pub required_players: usize,
    /// A departure that leaves fewer players than this mid-game sends the
    /// table back to the lobby.
    pub min_players: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_PLAYERS)
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(required_players: usize) -> Self {
        Self {
            required_players,
            min_players: required_players,
        }
    }

    #[must_use]
    pub const fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players;
        self
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if self.required_players == 0 || self.required_players > MAX_REQUIRED_PLAYERS {
            return Err(format!(
                "Required players must be between 1 and {MAX_REQUIRED_PLAYERS}"
            ));
        }

        if self.min_players == 0 || self.min_players > self.required_players {
            return Err(format!(
                "Min players must be between 1 and {}",
                self.required_players
            ));
        }

        Ok(())
    }
}

/// Owner of all game state.
#[derive(Debug)]
pub struct GameEngine {
    settings: GameSettings,
    players: HashMap<PlayerId, Player>,
    /// Raise order and guesser rotation. Always a permutation of the keys
    /// of `players`.
    turn_order: Vec<PlayerId>,
    /// Cursor into `turn_order` during the raising phase.
    current_turn_index: usize,
    current_round: u32,
    round_state: RoundState,
    round_message: String,
    /// Only meaningful while waiting for guesses or after the round is over.
    actual_total: u32,
}

impl Default for GameEngine {
    fn default() -> Self {
        GameSettings::default().into()
    }
}

impl From<GameSettings> for GameEngine {
    fn from(settings: GameSettings) -> Self {
        Self {
            settings,
            players: HashMap::new(),
            turn_order: Vec::new(),
            current_turn_index: 0,
            current_round: 0,
            round_state: RoundState::WaitingForPlayers,
            round_message: format!(
                "Waiting for {} players to join...",
                settings.required_players
            ),
            actual_total: 0,
        }
    }
}

impl GameEngine {
    pub fn new(settings: GameSettings) -> Self {
        settings.into()
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn round_state(&self) -> RoundState {
        self.round_state
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_message(&self) -> &str {
        &self.round_message
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains_player(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    /// Sum of all raised numbers, once the raising phase is complete.
    pub fn actual_total(&self) -> Option<u32> {
        match self.round_state {
            RoundState::WaitingForGuesses | RoundState::RoundOver => Some(self.actual_total),
            _ => None,
        }
    }

    /// Player whose turn it is to raise, if any.
    pub fn current_raiser(&self) -> Option<&PlayerId> {
        self.turn_order.get(self.current_turn_index)
    }

    /// The one player allowed to guess this round.
    pub fn designated_guesser(&self) -> Option<&PlayerId> {
        if self.turn_order.is_empty() || self.current_round == 0 {
            return None;
        }
        let index = (self.current_round as usize - 1) % self.turn_order.len();
        self.turn_order.get(index)
    }

    /// Player the table is waiting on right now.
    pub fn active_player_id(&self) -> Option<&PlayerId> {
        match self.round_state {
            RoundState::WaitingForNumbers => self.current_raiser(),
            RoundState::WaitingForGuesses => self.designated_guesser(),
            RoundState::WaitingForPlayers | RoundState::RoundOver => None,
        }
    }

    /// Seat a new player. Filling the last seat starts round 1.
    ///
    /// # Errors
    ///
    /// Fails if the id is already seated, the table is full, or a round is
    /// being played.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        username: Option<Username>,
    ) -> Result<(), UserError> {
        if self.players.contains_key(&player_id) {
            return Err(UserError::UserAlreadyExists);
        }
        if self.players.len() >= self.settings.required_players {
            return Err(UserError::CapacityReached);
        }
        if self.round_state.is_active() {
            return Err(UserError::GameAlreadyInProgress);
        }

        let username = username
            .filter(|username| !username.is_empty())
            .unwrap_or_else(|| Username::new(player_id.as_str()));

        self.players
            .insert(player_id.clone(), Player::new(username.clone()));
        self.turn_order.push(player_id.clone());

        info!(
            "Player {username} (ID: {player_id}) joined. Total players: {}/{}.",
            self.players.len(),
            self.settings.required_players
        );

        if self.players.len() == self.settings.required_players {
            self.start_new_round();
        } else {
            let remaining = self.settings.required_players - self.players.len();
            self.round_message =
                format!("Welcome {username}! Waiting for {remaining} more player(s).");
        }

        Ok(())
    }

    /// Remove a player, returning whether they were seated.
    ///
    /// Dropping below the minimum mid-game performs a soft restart. Otherwise
    /// the raising cursor keeps pointing at the same player, and if the
    /// departing player held the turn it passes to whoever now occupies
    /// their slot.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        let Some(player) = self.players.remove(player_id) else {
            return false;
        };

        let mut held_turn = false;
        if let Some(position) = self.turn_order.iter().position(|id| id == player_id) {
            held_turn = position == self.current_turn_index;
            self.turn_order.remove(position);
            if position < self.current_turn_index {
                self.current_turn_index -= 1;
            }
        }

        info!(
            "Player {} (ID: {player_id}) left. Total players: {}",
            player.username,
            self.players.len()
        );

        if self.round_state.is_active() && self.players.len() < self.settings.min_players {
            self.soft_restart();
        } else if self.round_state == RoundState::WaitingForPlayers {
            let remaining = self.settings.required_players - self.players.len();
            self.round_message = format!(
                "{} left. Waiting for {remaining} more player(s).",
                player.username
            );
        } else if self.round_state == RoundState::WaitingForGuesses {
            // The hidden total only ever covers seated players.
            self.actual_total = self.raised_total();
            let guesser = self
                .designated_guesser()
                .map(|id| self.username_of(id))
                .unwrap_or_default();
            self.round_message = format!(
                "{} left. Waiting for {guesser} to submit a guess.",
                player.username
            );
        } else if held_turn {
            self.check_for_state_transition();
        }

        true
    }

    /// Apply one client action.
    ///
    /// # Errors
    ///
    /// Returns why the action was ignored. Nothing is mutated on error.
    pub fn handle_action(&mut self, player_id: &PlayerId, action: &Action) -> Result<(), UserError> {
        if !self.players.contains_key(player_id) {
            return Err(UserError::UserDoesNotExist);
        }

        match (self.round_state, action) {
            (RoundState::WaitingForNumbers, Action::RaiseNumber { number }) => {
                self.raise_number(player_id, *number)
            }
            (RoundState::WaitingForGuesses, Action::MakeGuess { guess }) => {
                self.make_guess(player_id, *guess)
            }
            (RoundState::RoundOver, Action::StartNewRound) => {
                self.start_new_round();
                Ok(())
            }
            (state, action) => Err(UserError::InvalidAction {
                action: action.name().to_string(),
                state,
            }),
        }
    }

    /// Copy out everything a client may see.
    pub fn snapshot(&self) -> GameSnapshot {
        let reveal_guesses = self.round_state == RoundState::RoundOver;
        let players = self
            .players
            .iter()
            .map(|(id, player)| {
                let guess = player.guess.map(|guess| {
                    if reveal_guesses {
                        MaskedGuess::Revealed(guess)
                    } else {
                        MaskedGuess::Hidden
                    }
                });
                let view = PlayerView {
                    score: player.score,
                    raised_number: player.raised_number,
                    guess,
                };
                (id.clone(), view)
            })
            .collect();
        let player_usernames = self
            .players
            .iter()
            .map(|(id, player)| (id.clone(), player.username.clone()))
            .collect();

        GameSnapshot {
            current_round: self.current_round,
            round_state: self.round_state,
            round_message: self.round_message.clone(),
            players,
            actual_total: reveal_guesses.then_some(self.actual_total),
            required_players: self.settings.required_players,
            active_player_id: self.active_player_id().cloned(),
            player_usernames,
        }
    }

    fn username_of(&self, player_id: &PlayerId) -> String {
        self.players
            .get(player_id)
            .map_or_else(|| player_id.to_string(), |p| p.username.to_string())
    }

    fn update_round_state(&mut self, state: RoundState, message: String) {
        self.round_state = state;
        self.round_message = message;
        info!(
            "Game State Updated: {} - {}",
            self.round_state, self.round_message
        );
    }

    fn start_new_round(&mut self) {
        self.current_round += 1;
        self.actual_total = 0;
        for player in self.players.values_mut() {
            player.clear_round();
        }
        self.current_turn_index = 0;

        let raiser = self
            .current_raiser()
            .map(|id| self.username_of(id))
            .unwrap_or_default();
        self.update_round_state(
            RoundState::WaitingForNumbers,
            format!(
                "Round {}: Waiting for {raiser} to raise a number.",
                self.current_round
            ),
        );
        info!("--- Starting Round {} ---", self.current_round);
    }

    fn soft_restart(&mut self) {
        self.current_round = 0;
        self.current_turn_index = 0;
        self.actual_total = 0;
        for player in self.players.values_mut() {
            player.reset();
        }
        self.update_round_state(
            RoundState::WaitingForPlayers,
            "A player disconnected. Waiting for players.".to_string(),
        );
    }

    fn raise_number(&mut self, player_id: &PlayerId, number: i64) -> Result<(), UserError> {
        if self.current_raiser() != Some(player_id) {
            return Err(UserError::OutOfTurnAction);
        }
        if !RAISE_CHOICES.contains(&number) {
            return Err(UserError::InvalidNumber { number });
        }
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(UserError::UserDoesNotExist)?;
        if player.raised_number.is_some() {
            return Err(UserError::AlreadyRaised);
        }

        // RAISE_CHOICES keeps this within u8.
        player.raised_number = Some(number as u8);
        debug!("Player {} (ID: {player_id}) raised: {number}", player.username);

        self.current_turn_index += 1;
        self.check_for_state_transition();
        Ok(())
    }

    fn make_guess(&mut self, player_id: &PlayerId, guess: i64) -> Result<(), UserError> {
        if self.designated_guesser() != Some(player_id) {
            return Err(UserError::OutOfTurnAction);
        }

        let min = self.players.len() as i64;
        let max = min * 2;
        if !(min..=max).contains(&guess) {
            return Err(UserError::InvalidGuess { guess, min, max });
        }

        let round = self.current_round;
        let actual_total = self.actual_total;
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(UserError::UserDoesNotExist)?;
        player.guess = Some(guess);
        debug!(
            "Player {} (ID: {player_id}) submitted guess: {guess}",
            player.username
        );

        let message = if guess == i64::from(actual_total) {
            player.score += 1;
            format!(
                "Round {round} Over! {} guessed correctly ({guess}) and wins!",
                player.username
            )
        } else {
            format!(
                "Round {round} Over! {} guessed {guess}, but the total was {actual_total}.",
                player.username
            )
        };

        self.update_round_state(RoundState::RoundOver, message);
        Ok(())
    }

    fn raised_total(&self) -> u32 {
        self.players
            .values()
            .filter_map(|player| player.raised_number)
            .map(u32::from)
            .sum()
    }

    /// End-of-phase check run inside the mutation that may complete the
    /// raising phase.
    fn check_for_state_transition(&mut self) {
        if self.round_state != RoundState::WaitingForNumbers {
            return;
        }

        if self.current_turn_index >= self.turn_order.len() {
            self.actual_total = self.raised_total();
            let guesser = self
                .designated_guesser()
                .map(|id| self.username_of(id))
                .unwrap_or_default();
            self.update_round_state(
                RoundState::WaitingForGuesses,
                format!("All numbers are in! Waiting for {guesser} to submit a guess."),
            );
            info!(
                "All players raised. Actual total is {} (hidden).",
                self.actual_total
            );
        } else {
            let raiser = self
                .current_raiser()
                .map(|id| self.username_of(id))
                .unwrap_or_default();
            self.round_message = format!("Waiting for {raiser} to raise a number.");
        }
    }
}
