//! Table actor implementation with async message handling.

use super::{
    config::TableConfig,
    messages::{TableError, TableMessage},
};
use crate::game::{
    GameEngine, UserError,
    entities::{Action, GameSnapshot, PlayerId, Username},
};
use tokio::sync::{mpsc, oneshot};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>) -> Self {
        Self { sender }
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, TableError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| TableError::Closed)
    }

    /// Seat a player. The inner result is the engine's verdict.
    pub async fn add_player(
        &self,
        player_id: PlayerId,
        username: Option<Username>,
    ) -> Result<Result<(), UserError>, TableError> {
        self.request(|response| TableMessage::AddPlayer {
            player_id,
            username,
            response,
        })
        .await
    }

    /// Remove a player, returning whether they were seated.
    pub async fn remove_player(&self, player_id: PlayerId) -> Result<bool, TableError> {
        self.request(|response| TableMessage::RemovePlayer {
            player_id,
            response,
        })
        .await
    }

    /// Apply an action. The inner result says why it was ignored, if it was.
    pub async fn handle_action(
        &self,
        player_id: PlayerId,
        action: Action,
    ) -> Result<Result<(), UserError>, TableError> {
        self.request(|response| TableMessage::TakeAction {
            player_id,
            action,
            response,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, TableError> {
        self.request(|response| TableMessage::GetSnapshot { response })
            .await
    }

    pub async fn contains_player(&self, player_id: PlayerId) -> Result<bool, TableError> {
        self.request(|response| TableMessage::ContainsPlayer {
            player_id,
            response,
        })
        .await
    }

    /// Ask the actor to stop after the messages already queued.
    pub async fn close(&self) -> Result<(), TableError> {
        self.request(|response| TableMessage::Close { response })
            .await
    }
}

/// Table actor owning the game engine.
///
/// Messages are handled one at a time and each runs to completion, so every
/// engine operation (including any phase transition it triggers) is observed
/// by other tasks as a single atomic step.
pub struct TableActor {
    /// Table configuration
    config: TableConfig,

    /// Game state (FSM)
    engine: GameEngine,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `config` - Table configuration
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(config: TableConfig) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));

        let engine = GameEngine::new(config.game_settings());

        let actor = Self {
            config,
            engine,
            inbox,
            is_closed: false,
        };

        (actor, TableHandle::new(sender))
    }

    /// Create an actor and run it on the current tokio runtime.
    pub fn spawn(config: TableConfig) -> TableHandle {
        let (actor, handle) = Self::new(config);
        tokio::spawn(actor.run());
        handle
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Table '{}' starting, waiting for {} players",
            self.config.name,
            self.engine.settings().required_players
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);

            if self.is_closed {
                break;
            }
        }

        log::info!("Table '{}' closed", self.config.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::AddPlayer {
                player_id,
                username,
                response,
            } => {
                let result = self.engine.add_player(player_id.clone(), username);
                if let Err(e) = &result {
                    log::info!(
                        "Table '{}': join by {} refused: {}",
                        self.config.name,
                        player_id,
                        e
                    );
                }
                let _ = response.send(result);
            }

            TableMessage::RemovePlayer {
                player_id,
                response,
            } => {
                let removed = self.engine.remove_player(&player_id);
                let _ = response.send(removed);
            }

            TableMessage::TakeAction {
                player_id,
                action,
                response,
            } => {
                let result = self.engine.handle_action(&player_id, &action);
                match &result {
                    Err(e) if e.is_illegal_action() => log::debug!(
                        "Table '{}': ignored {} from {}: {}",
                        self.config.name,
                        action.name(),
                        player_id,
                        e
                    ),
                    Err(e) => log::info!(
                        "Table '{}': rejected {} from {}: {}",
                        self.config.name,
                        action.name(),
                        player_id,
                        e
                    ),
                    Ok(()) => {}
                }
                let _ = response.send(result);
            }

            TableMessage::GetSnapshot { response } => {
                let _ = response.send(self.engine.snapshot());
            }

            TableMessage::ContainsPlayer {
                player_id,
                response,
            } => {
                let _ = response.send(self.engine.contains_player(&player_id));
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }
}
