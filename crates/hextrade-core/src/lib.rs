//! Hextrade - rules engine for a hex-board resource trading game
//!
//! This crate provides the core game logic, including:
//! - Hex coordinate system where corners and sides have several spellings
//! - Board generation for the standard and extended layouts
//! - Player state, resource hands and development cards
//! - Turn engine with setup, dice, robber, trading and special building
//! - Per-player views that hide opponents' private information
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for hex tiles, vertices, and edges
//! - [`board`]: Tiles, ports, buildings and the robber
//! - [`placement`]: Legality of settlements, cities and roads
//! - [`distribution`]: Resource production
//! - [`achievements`]: Longest Road and Largest Army
//! - [`game`]: Game state machine
//! - [`view`]: Redacted per-player projection

pub mod achievements;
pub mod actions;
pub mod board;
pub mod config;
pub mod distribution;
pub mod error;
pub mod game;
pub mod hex;
pub mod placement;
pub mod player;
pub mod view;

// Re-export commonly used types
pub use achievements::{longest_road_length, resolve_holder, Achievement};
pub use actions::{GameAction, GameEvent, TradeOffer};
pub use board::{
    Board, EdgeBuilding, PlayerId, Port, PortKind, Resource, Terrain, Tile, VertexBuilding,
};
pub use config::{BoardSize, GameConfig};
pub use distribution::ResourceGain;
pub use error::GameError;
pub use game::{GamePhase, GameState, PendingTrade, SetupRound, TurnPhase};
pub use hex::{EdgeCoord, EdgeDirection, HexCoord, VertexCoord, VertexDirection};
pub use player::{DevelopmentCard, Player, PlayerColor, ResourceHand};
pub use view::{DevCardsView, HandView, PlayerSummary, PlayerView};
