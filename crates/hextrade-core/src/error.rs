//! Typed failure reasons returned by every engine operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when applying an operation.
///
/// An operation that returns one of these has left the game untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Unknown {0}")]
    NotFound(String),

    #[error("Invalid action for current phase")]
    WrongPhase,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("That spot is already built on")]
    Occupied,

    #[error("Too close to another building")]
    TooClose,

    #[error("Not connected to your roads or buildings")]
    Disconnected,

    #[error("Cannot afford this")]
    InsufficientResources,

    #[error("No pieces remaining")]
    InsufficientInventory,

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No development cards left in deck")]
    DeckEmpty,

    #[error("Trade ratio is {expected}:1, offered {offered}")]
    RatioMismatch { expected: u32, offered: u32 },

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("No active trade")]
    NoPendingTrade,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Already played a development card this turn")]
    DevCardAlreadyPlayed,

    #[error("Invalid discard: {0}")]
    InvalidDiscard(String),

    #[error("Game is full")]
    GameFull,

    #[error("Need at least 2 players")]
    NotEnoughPlayers,

    #[error("Game is over")]
    GameOver,
}

impl GameError {
    /// Stable kebab-case reason code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not-found",
            GameError::WrongPhase => "wrong-phase",
            GameError::NotYourTurn => "not-your-turn",
            GameError::Occupied => "occupied",
            GameError::TooClose => "too-close",
            GameError::Disconnected => "disconnected",
            GameError::InsufficientResources => "insufficient-resources",
            GameError::InsufficientInventory => "insufficient-inventory",
            GameError::InvalidTarget(_) => "invalid-target",
            GameError::DeckEmpty => "deck-empty",
            GameError::RatioMismatch { .. } => "ratio-mismatch",
            GameError::InvalidTrade => "invalid-trade",
            GameError::NoPendingTrade => "no-pending-trade",
            GameError::NoSuchCard => "no-such-card",
            GameError::DevCardAlreadyPlayed => "dev-card-already-played",
            GameError::InvalidDiscard(_) => "invalid-discard",
            GameError::GameFull => "game-full",
            GameError::NotEnoughPlayers => "not-enough-players",
            GameError::GameOver => "game-over",
        }
    }
}
