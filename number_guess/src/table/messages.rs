//! Table actor message types.

use crate::game::{
    UserError,
    entities::{Action, GameSnapshot, PlayerId, Username},
};
use tokio::sync::oneshot;

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Seat a new player
    AddPlayer {
        player_id: PlayerId,
        username: Option<Username>,
        response: oneshot::Sender<Result<(), UserError>>,
    },

    /// Remove a player; replies whether they were seated
    RemovePlayer {
        player_id: PlayerId,
        response: oneshot::Sender<bool>,
    },

    /// Player action (raise, guess, start a new round)
    TakeAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<Result<(), UserError>>,
    },

    /// Get a snapshot of the current game
    GetSnapshot {
        response: oneshot::Sender<GameSnapshot>,
    },

    /// Check whether a player is seated
    ContainsPlayer {
        player_id: PlayerId,
        response: oneshot::Sender<bool>,
    },

    /// Stop the actor
    Close { response: oneshot::Sender<()> },
}

/// Errors talking to a table actor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("Table is closed")]
    Closed,
}
