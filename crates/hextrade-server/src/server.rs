//! WebSocket server and connection handling.
//!
//! Each room sits behind its own `DashMap` entry lock, so operations on one
//! game are serialised while different games proceed in parallel.

use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{Departure, GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use hextrade_core::GameEvent;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from connection ID to its room ID
    pub connection_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to its message sender
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            connection_rooms: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection) {
            let _ = sender.send(msg);
        }
    }

    /// Send the same message to a list of connections.
    fn send_all(&self, connections: &[Uuid], msg: ServerMessage) {
        for connection in connections {
            self.send_to(*connection, msg.clone());
        }
    }

    fn send_error(&self, connection: Uuid, err: RoomError) {
        match err {
            RoomError::Game(e) => self.send_to(
                connection,
                ServerMessage::ActionRejected {
                    code: e.code().to_string(),
                    reason: e.to_string(),
                },
            ),
            other => self.send_to(
                connection,
                ServerMessage::Error {
                    code: other.code().to_string(),
                    message: other.to_string(),
                },
            ),
        }
    }

    /// Get list of waiting rooms.
    pub fn waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    fn room_of(&self, connection: Uuid) -> Option<Uuid> {
        self.connection_rooms.get(&connection).map(|r| *r)
    }

    /// Broadcast public events, then each seat's own view, for a room.
    ///
    /// Everything is collected under the room lock and sent after it is
    /// released.
    fn publish(&self, room_id: Uuid, events: Vec<GameEvent>) {
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        let connections = room.connections();
        let info = room.to_info();
        let views = room.views();
        drop(room);

        if !events.is_empty() {
            self.send_all(&connections, ServerMessage::Events { events });
        }
        self.send_all(&connections, ServerMessage::RoomUpdated { room: info });
        for (connection, view) in views {
            self.send_to(connection, ServerMessage::GameView { view: Box::new(view) });
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Hextrade server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    ws_sender.send(Message::Text(serde_json::to_string(&welcome)?)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(connection_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", connection_id, e);
                    state.send_to(
                        connection_id,
                        ServerMessage::Error {
                            code: "malformed".to_string(),
                            message: format!("malformed message: {e}"),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to(connection_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    leave_room(connection_id, &state);
    state.senders.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(connection: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom { player_name, config } => {
            if state.connection_rooms.contains_key(&connection) {
                state.send_error(connection, RoomError::AlreadySeated);
                return;
            }
            let room_id = Uuid::new_v4();
            match GameRoom::new(room_id, connection, player_name, config) {
                Ok(room) => {
                    let Some(seat) = room.seat(connection).cloned() else {
                        return;
                    };
                    let joined = seat.joined_event();
                    let info = room.to_info();
                    state.rooms.insert(room_id, room);
                    state.connection_rooms.insert(connection, room_id);
                    info!(%room_id, "room created");

                    state.send_to(
                        connection,
                        ServerMessage::RoomJoined {
                            room: info,
                            player_id: seat.player_id,
                            token: seat.token,
                        },
                    );
                    state.publish(room_id, vec![joined]);
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::JoinRoom { room_id, player_name } => {
            if state.connection_rooms.contains_key(&connection) {
                state.send_error(connection, RoomError::AlreadySeated);
                return;
            }
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(connection, RoomError::RoomNotFound);
                return;
            };
            let seated = room.add_player(connection, player_name).map(|seat| seat.clone());
            let info = room.to_info();
            drop(room);

            match seated {
                Ok(seat) => {
                    state.connection_rooms.insert(connection, room_id);
                    info!(%room_id, player = seat.player_id, "player joined");
                    let joined = seat.joined_event();
                    state.send_to(
                        connection,
                        ServerMessage::RoomJoined {
                            room: info,
                            player_id: seat.player_id,
                            token: seat.token,
                        },
                    );
                    state.publish(room_id, vec![joined]);
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::Rejoin { room_id, token } => {
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(connection, RoomError::RoomNotFound);
                return;
            };
            let rejoined = room.rejoin(connection, token).map(|seat| seat.clone());
            let info = room.to_info();
            drop(room);

            match rejoined {
                Ok(seat) => {
                    state.connection_rooms.insert(connection, room_id);
                    info!(%room_id, player = seat.player_id, "player rejoined");
                    state.send_to(
                        connection,
                        ServerMessage::RoomJoined {
                            room: info,
                            player_id: seat.player_id,
                            token: seat.token,
                        },
                    );
                    state.publish(room_id, Vec::new());
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::LeaveRoom => {
            leave_room(connection, state);
            state.send_to(connection, ServerMessage::LeftRoom);
        }

        ClientMessage::ReshuffleBoard => {
            with_room(connection, state, |room| {
                room.reshuffle_board(connection)?;
                Ok(vec![GameEvent::BoardReshuffled])
            });
        }

        ClientMessage::StartGame => {
            with_room(connection, state, |room| room.start_game(connection));
        }

        ClientMessage::GameAction { action } => {
            debug!(%connection, ?action, "game action");
            with_room(connection, state, |room| room.apply_action(connection, action));
        }

        ClientMessage::ListRooms => {
            let rooms = state.waiting_rooms();
            state.send_to(connection, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to(connection, ServerMessage::Pong);
        }
    }
}

/// Run an operation on the caller's room and publish the outcome.
fn with_room<F>(connection: Uuid, state: &Arc<ServerState>, op: F)
where
    F: FnOnce(&mut GameRoom) -> Result<Vec<GameEvent>, RoomError>,
{
    let Some(room_id) = state.room_of(connection) else {
        state.send_error(connection, RoomError::PlayerNotInRoom);
        return;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        state.send_error(connection, RoomError::RoomNotFound);
        return;
    };
    let result = op(&mut room);
    drop(room);

    match result {
        Ok(events) => state.publish(room_id, events),
        Err(e) => state.send_error(connection, e),
    }
}

/// Free or release the connection's seat and drop empty rooms.
fn leave_room(connection: Uuid, state: &Arc<ServerState>) {
    let Some((_, room_id)) = state.connection_rooms.remove(&connection) else {
        return;
    };
    let departure = match state.rooms.get_mut(&room_id) {
        Some(mut room) => room.remove_player(connection).ok(),
        None => None,
    };

    match departure {
        Some(Departure { room_empty: true, .. }) => {
            state.rooms.remove(&room_id);
            info!(%room_id, "room closed");
        }
        Some(Departure { events, .. }) => state.publish(room_id, events),
        None => {}
    }
}
