use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::RoundState;

/// Reasons the engine refuses a join or an action.
///
/// Join failures (`UserAlreadyExists`, `CapacityReached`, `GameAlreadyInProgress`)
/// are reported to the joining client. Everything for which
/// [`UserError::is_illegal_action`] holds is only ever logged server-side.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("Player ID already exists.")]
    UserAlreadyExists,
    #[error("Game is full.")]
    CapacityReached,
    #[error("Game already in progress.")]
    GameAlreadyInProgress,
    #[error("Player not found in game.")]
    UserDoesNotExist,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("{action} not allowed while {state}")]
    InvalidAction { action: String, state: RoundState },
    #[error("can't raise {number}, must be 1 or 2")]
    InvalidNumber { number: i64 },
    #[error("already raised a number this round")]
    AlreadyRaised,
    #[error("guess {guess} outside {min}..={max}")]
    InvalidGuess { guess: i64, min: i64, max: i64 },
    #[error("unrecognized action")]
    UnrecognizedAction,
}

impl UserError {
    /// Whether this is a silently dropped gameplay rejection rather than a
    /// join or identity failure.
    pub fn is_illegal_action(&self) -> bool {
        matches!(
            self,
            Self::OutOfTurnAction
                | Self::InvalidAction { .. }
                | Self::InvalidNumber { .. }
                | Self::AlreadyRaised
                | Self::InvalidGuess { .. }
                | Self::UnrecognizedAction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_errors_use_client_facing_messages() {
        assert_eq!(UserError::CapacityReached.to_string(), "Game is full.");
        assert_eq!(
            UserError::UserAlreadyExists.to_string(),
            "Player ID already exists."
        );
    }

    #[test]
    fn test_illegal_action_classification() {
        assert!(UserError::OutOfTurnAction.is_illegal_action());
        assert!(UserError::AlreadyRaised.is_illegal_action());
        assert!(UserError::InvalidNumber { number: 3 }.is_illegal_action());
        assert!(UserError::UnrecognizedAction.is_illegal_action());
        assert!(!UserError::CapacityReached.is_illegal_action());
        assert!(!UserError::UserDoesNotExist.is_illegal_action());
    }

    #[test]
    fn test_invalid_action_display() {
        let error = UserError::InvalidAction {
            action: "make_guess".to_string(),
            state: RoundState::WaitingForNumbers,
        };
        assert_eq!(
            error.to_string(),
            "make_guess not allowed while WAITING_FOR_NUMBERS"
        );
    }
}
