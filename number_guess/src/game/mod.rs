//! Game session engine.
//!
//! This module provides:
//! - Player, action and snapshot types
//! - The round state machine ([`engine::GameEngine`])
//! - Rejection reasons for joins and actions

pub mod constants;
pub mod engine;
pub mod entities;
pub mod errors;

pub use engine::{GameEngine, GameSettings};
pub use errors::UserError;
