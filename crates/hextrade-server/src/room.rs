//! Game room management.
//!
//! A room owns one `GameState` from the moment it is created. Lobby seats map
//! directly onto engine players, so joining and leaving before the start go
//! through the engine's own roster operations.

use hextrade_core::{
    GameAction, GameConfig, GameError, GameEvent, GamePhase, GameState, PlayerId, PlayerView,
};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Already seated in a room")]
    AlreadySeated,

    #[error("Not the host")]
    NotHost,

    #[error("Unknown rejoin token")]
    UnknownToken,

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// Wire code: the engine's own code for game errors
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound => "room-not-found",
            RoomError::PlayerNotInRoom => "not-in-room",
            RoomError::AlreadySeated => "already-seated",
            RoomError::NotHost => "not-host",
            RoomError::UnknownToken => "unknown-token",
            RoomError::Game(e) => e.code(),
        }
    }
}

/// A seat in a game room, bound to the connection currently using it.
#[derive(Debug, Clone)]
pub struct RoomSeat {
    pub player_id: PlayerId,
    pub name: String,
    /// Secret used to reclaim the seat from a new connection
    pub token: Uuid,
    pub connected: bool,
}

impl RoomSeat {
    pub fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            name,
            token: Uuid::new_v4(),
            connected: true,
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.player_id,
            name: self.name.clone(),
            connected: self.connected,
        }
    }

    /// Public announcement of this seat being taken
    pub fn joined_event(&self) -> GameEvent {
        GameEvent::PlayerJoined {
            player: self.player_id,
            name: self.name.clone(),
        }
    }
}

/// Outcome of a connection leaving its room
#[derive(Debug, Default)]
pub struct Departure {
    /// Events to publish to whoever is still seated
    pub events: Vec<GameEvent>,
    /// No connected seat remains and the room can be dropped
    pub room_empty: bool,
}

/// A game room that can hold multiple players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    /// Engine id of the player allowed to start and reshuffle
    pub host: PlayerId,
    pub status: RoomStatus,
    /// Seats keyed by connection id
    pub seats: HashMap<Uuid, RoomSeat>,
    pub game: GameState,
}

impl GameRoom {
    /// Create a room with its host already seated
    pub fn new(
        id: Uuid,
        host_connection: Uuid,
        host_name: String,
        config: GameConfig,
    ) -> Result<Self, RoomError> {
        let mut game = GameState::new(config);
        let host = game.add_player(host_name.clone())?;

        let mut seats = HashMap::new();
        seats.insert(host_connection, RoomSeat::new(host, host_name.clone()));

        Ok(Self {
            id,
            name: format!("{}'s Game", host_name),
            host,
            status: RoomStatus::Waiting,
            seats,
            game,
        })
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.game.config.max_players()
    }

    pub fn seat(&self, connection: Uuid) -> Option<&RoomSeat> {
        self.seats.get(&connection)
    }

    fn seated_player(&self, connection: Uuid) -> Result<PlayerId, RoomError> {
        self.seats
            .get(&connection)
            .map(|s| s.player_id)
            .ok_or(RoomError::PlayerNotInRoom)
    }

    fn require_host(&self, connection: Uuid) -> Result<(), RoomError> {
        if self.seated_player(connection)? != self.host {
            return Err(RoomError::NotHost);
        }
        Ok(())
    }

    /// Take a new seat; the engine rejects joins once the game has started
    pub fn add_player(&mut self, connection: Uuid, name: String) -> Result<&RoomSeat, RoomError> {
        if self.seats.contains_key(&connection) {
            return Err(RoomError::AlreadySeated);
        }
        let player_id = self.game.add_player(name.clone())?;
        Ok(self
            .seats
            .entry(connection)
            .or_insert_with(|| RoomSeat::new(player_id, name)))
    }

    /// Leave the room. Before the start the seat is freed; afterwards it is
    /// only marked disconnected so the player can rejoin.
    pub fn remove_player(&mut self, connection: Uuid) -> Result<Departure, RoomError> {
        let player_id = self.seated_player(connection)?;

        if self.status != RoomStatus::Waiting {
            self.set_player_connected(connection, false);
            return Ok(Departure {
                events: Vec::new(),
                room_empty: self.seats.values().all(|s| !s.connected),
            });
        }

        self.game.remove_player(player_id)?;
        self.seats.remove(&connection);

        // If host left, hand the room to the longest-seated player
        if player_id == self.host {
            if let Some(next) = self.seats.values().map(|s| s.player_id).min() {
                self.host = next;
            }
        }

        Ok(Departure {
            events: vec![GameEvent::PlayerLeft { player: player_id }],
            room_empty: self.seats.is_empty(),
        })
    }

    pub fn set_player_connected(&mut self, connection: Uuid, connected: bool) {
        if let Some(seat) = self.seats.get_mut(&connection) {
            seat.connected = connected;
        }
    }

    /// Move the seat holding `token` onto a new connection
    pub fn rejoin(&mut self, connection: Uuid, token: Uuid) -> Result<&RoomSeat, RoomError> {
        let old = self
            .seats
            .iter()
            .find(|(_, seat)| seat.token == token)
            .map(|(conn, _)| *conn)
            .ok_or(RoomError::UnknownToken)?;
        if old != connection && self.seats.contains_key(&connection) {
            return Err(RoomError::AlreadySeated);
        }

        let mut seat = self.seats.remove(&old).ok_or(RoomError::UnknownToken)?;
        seat.connected = true;
        Ok(self.seats.entry(connection).or_insert(seat))
    }

    pub fn reshuffle_board(&mut self, requester: Uuid) -> Result<(), RoomError> {
        self.require_host(requester)?;
        self.game.reshuffle_board()?;
        Ok(())
    }

    pub fn start_game(&mut self, requester: Uuid) -> Result<Vec<GameEvent>, RoomError> {
        self.require_host(requester)?;
        let events = self.game.start_game()?;
        self.status = RoomStatus::InGame;
        Ok(events)
    }

    /// Apply an action on behalf of the player seated at `connection`
    pub fn apply_action(
        &mut self,
        connection: Uuid,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, RoomError> {
        let player_id = self.seated_player(connection)?;
        let events = self.game.apply_action(player_id, action)?;

        if self.game.phase == GamePhase::Finished {
            self.status = RoomStatus::Finished;
        }
        Ok(events)
    }

    /// Each connected seat's own view of the game
    pub fn views(&self) -> Vec<(Uuid, PlayerView)> {
        self.seats
            .iter()
            .filter(|(_, seat)| seat.connected)
            .map(|(conn, seat)| (*conn, self.game.view_for(seat.player_id)))
            .collect()
    }

    pub fn connections(&self) -> Vec<Uuid> {
        self.seats.keys().copied().collect()
    }

    pub fn to_info(&self) -> RoomInfo {
        // Engine order: seating order in the lobby, turn order once started
        let players = self
            .game
            .players
            .iter()
            .filter_map(|p| self.seats.values().find(|s| s.player_id == p.id))
            .map(RoomSeat::to_info)
            .collect();

        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players,
            max_players: self.game.config.max_players(),
            host: self.host,
            status: self.status,
            config: self.game.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hextrade_core::HandView;

    fn room(config: GameConfig) -> (GameRoom, Uuid) {
        let host = Uuid::new_v4();
        let room = GameRoom::new(Uuid::new_v4(), host, "Host".to_string(), config).unwrap();
        (room, host)
    }

    #[test]
    fn test_create_room() {
        let (room, host) = room(GameConfig::default());

        assert_eq!(room.player_count(), 1);
        assert!(!room.is_full());
        assert_eq!(room.seat(host).unwrap().player_id, room.host);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.to_info().max_players, 4);
    }

    #[test]
    fn test_add_remove_players() {
        let (mut room, host) = room(GameConfig::default());

        for i in 2..=4 {
            room.add_player(Uuid::new_v4(), format!("Player {i}")).unwrap();
        }
        assert!(room.is_full());

        // Can't add more players
        assert!(matches!(
            room.add_player(Uuid::new_v4(), "Player 5".to_string()),
            Err(RoomError::Game(GameError::GameFull))
        ));

        // Host leaving hands the room over
        let host_id = room.host;
        let departure = room.remove_player(host).unwrap();
        assert!(!departure.room_empty);
        assert_eq!(departure.events, vec![GameEvent::PlayerLeft { player: host_id }]);
        assert_eq!(room.player_count(), 3);
        assert_eq!(room.game.player_count(), 3);
        assert_ne!(room.host, 0);
    }

    #[test]
    fn test_join_announces_seat() {
        let (mut room, _) = room(GameConfig::default());
        let event = room
            .add_player(Uuid::new_v4(), "Guest".to_string())
            .unwrap()
            .joined_event();
        assert_eq!(
            event,
            GameEvent::PlayerJoined {
                player: 1,
                name: "Guest".to_string(),
            }
        );
    }

    #[test]
    fn test_last_player_leaving_empties_room() {
        let (mut room, host) = room(GameConfig::default());
        assert!(room.remove_player(host).unwrap().room_empty);
        assert!(matches!(room.remove_player(host), Err(RoomError::PlayerNotInRoom)));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RoomError::NotHost.code(), "not-host");
        assert_eq!(RoomError::Game(GameError::GameFull).code(), GameError::GameFull.code());
    }

    #[test]
    fn test_start_game() {
        let (mut room, host) = room(GameConfig::default());

        // Can't start with only 1 player
        assert!(matches!(
            room.start_game(host),
            Err(RoomError::Game(GameError::NotEnoughPlayers))
        ));

        let player2 = Uuid::new_v4();
        room.add_player(player2, "Player 2".to_string()).unwrap();

        // Non-host can't start or reshuffle
        assert!(matches!(room.start_game(player2), Err(RoomError::NotHost)));
        assert!(matches!(room.reshuffle_board(player2), Err(RoomError::NotHost)));
        room.reshuffle_board(host).unwrap();

        room.start_game(host).unwrap();
        assert_eq!(room.status, RoomStatus::InGame);
        assert!(matches!(
            room.add_player(Uuid::new_v4(), "Late".to_string()),
            Err(RoomError::Game(GameError::WrongPhase))
        ));
    }

    #[test]
    fn test_rejoin_moves_seat() {
        let (mut room, host) = room(GameConfig::default());
        let guest = Uuid::new_v4();
        let token = room.add_player(guest, "Guest".to_string()).unwrap().token;
        room.start_game(host).unwrap();

        // Disconnect mid-game keeps the seat and announces nothing
        let departure = room.remove_player(guest).unwrap();
        assert!(!departure.room_empty);
        assert!(departure.events.is_empty());
        assert!(!room.seat(guest).unwrap().connected);

        let fresh = Uuid::new_v4();
        assert!(matches!(room.rejoin(fresh, Uuid::new_v4()), Err(RoomError::UnknownToken)));
        let seat = room.rejoin(fresh, token).unwrap();
        assert!(seat.connected);
        assert!(room.seat(guest).is_none());
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn test_actions_are_checked_by_engine() {
        let (mut room, host) = room(GameConfig::default());
        let guest = Uuid::new_v4();
        room.add_player(guest, "Guest".to_string()).unwrap();
        room.start_game(host).unwrap();

        let first = room.game.acting_player_id().unwrap();
        let idle = if room.seat(host).unwrap().player_id == first { guest } else { host };

        let err = room.apply_action(idle, GameAction::RollDice).unwrap_err();
        assert_eq!(err.code(), "not-your-turn");
        assert!(matches!(
            room.apply_action(Uuid::new_v4(), GameAction::RollDice),
            Err(RoomError::PlayerNotInRoom)
        ));
    }

    #[test]
    fn test_views_are_per_seat() {
        let (mut room, _) = room(GameConfig::default());
        let guest = Uuid::new_v4();
        room.add_player(guest, "Guest".to_string()).unwrap();

        let views = room.views();
        assert_eq!(views.len(), 2);
        for (conn, view) in views {
            let own = room.seat(conn).unwrap().player_id;
            assert_eq!(view.viewer, own);
            for player in &view.players {
                let hidden = matches!(player.hand, HandView::Hidden { .. });
                assert_eq!(hidden, player.id != own);
            }
        }
    }
}
