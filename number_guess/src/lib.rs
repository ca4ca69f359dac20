//! # Number Guess
//!
//! A small multiplayer "raise and guess" game session engine.
//!
//! Players join a single shared game. Once the configured number of players
//! is seated, each round runs in two phases: every player in turn raises a
//! number (1 or 2), then one designated guesser tries to name the total.
//! A correct guess scores a point and the round ends.
//!
//! ## Architecture
//!
//! The round lifecycle is a four-state machine:
//!
//! - **WAITING_FOR_PLAYERS**: Lobby until the seats are filled
//! - **WAITING_FOR_NUMBERS**: Players raise in turn order
//! - **WAITING_FOR_GUESSES**: The designated guesser names the total
//! - **ROUND_OVER**: Result shown until anyone starts the next round
//!
//! ## Core Modules
//!
//! - [`game`]: Engine, entities and rejection reasons
//! - [`table`]: Actor that serialises every engine access
//! - [`session`]: Connection registry and snapshot broadcast
//! - [`net`]: Wire messages, line framing and a blocking client
//!
//! ## Example
//!
//! ```
//! use number_guess::{GameEngine, GameSettings, entities::RoundState};
//!
//! let mut game = GameEngine::new(GameSettings::new(2));
//! game.add_player("player_a".into(), Some("alice".into())).unwrap();
//! game.add_player("player_b".into(), Some("bob".into())).unwrap();
//! assert_eq!(game.round_state(), RoundState::WaitingForNumbers);
//! ```

/// Networking components shared by the server and clients.
pub mod net;
pub use net::{client::Client, messages, utils};

/// Core game logic and entities.
pub mod game;
pub use game::{
    GameEngine, GameSettings, UserError,
    constants::{self, DEFAULT_REQUIRED_PLAYERS, MAX_REQUIRED_PLAYERS},
    entities,
};

/// Push connection registry.
pub mod session;
pub use session::SessionRegistry;

/// Actor owning the game engine.
pub mod table;
pub use table::{TableActor, TableConfig, TableHandle};
