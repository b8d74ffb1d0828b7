//! WebSocket protocol messages for Hextrade multiplayer.

use hextrade_core::{GameAction, GameConfig, GameEvent, PlayerId, PlayerView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room and take its first seat
    CreateRoom {
        player_name: String,
        #[serde(default)]
        config: GameConfig,
    },

    /// Join an existing room
    JoinRoom { room_id: Uuid, player_name: String },

    /// Reclaim a seat after reconnecting
    Rejoin { room_id: Uuid, token: Uuid },

    /// Leave current room
    LeaveRoom,

    /// Deal a new board before starting (host only)
    ReshuffleBoard,

    /// Start the game (host only)
    StartGame,

    /// Submit a game action
    GameAction { action: GameAction },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the connection's id
    Welcome { connection_id: Uuid },

    /// Seat taken; keep `token` to rejoin after a disconnect
    RoomJoined {
        room: RoomInfo,
        player_id: PlayerId,
        token: Uuid,
    },

    /// Left room successfully
    LeftRoom,

    /// Room state updated (player joined/left/reconnected)
    RoomUpdated { room: RoomInfo },

    /// The receiving player's redacted view of the game
    GameView { view: Box<PlayerView> },

    /// Public results of the last operation
    Events { events: Vec<GameEvent> },

    /// The game refused an action
    ActionRejected { code: String, reason: String },

    /// List of rooms still waiting for players
    RoomList { rooms: Vec<RoomInfo> },

    /// A room-level request failed
    Error { code: String, message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: usize,
    pub host: PlayerId,
    pub status: RoomStatus,
    pub config: GameConfig,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub name: String,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}
