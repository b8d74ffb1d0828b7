//! Settlement, city and road legality.
//!
//! Validators only read the board and the acting player. They never check
//! affordability; the turn engine does that against [`crate::player::costs`]
//! because setup and free-road placements skip payment.

use crate::board::{Board, EdgeBuilding, PlayerId, VertexBuilding};
use crate::error::GameError;
use crate::hex::{EdgeCoord, VertexCoord};
use crate::player::Player;
use serde::{Deserialize, Serialize};

/// Where a settlement is being placed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementContext {
    /// Opening placement: no road needed
    Setup,
    /// Regular build: must touch one of the player's roads
    Normal,
}

/// How a road is being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadContext {
    /// Opening placement: must touch the settlement just placed
    Setup { settlement: VertexCoord },
    /// Road-building card credit
    FreeRoad,
    /// Regular paid road
    Paid,
}

/// Check the distance rule: no building on any corner one side length away.
///
/// Neighbours come from [`VertexCoord::adjacent_vertices`], which matches
/// [`VertexCoord::is_geometrically_adjacent`] for every pair of corners.
pub fn satisfies_distance_rule(board: &Board, vertex: &VertexCoord) -> bool {
    vertex.adjacent_vertices().iter().all(|adj| {
        debug_assert!(vertex.is_geometrically_adjacent(adj));
        board.building_at(adj) == VertexBuilding::Empty
    })
}

/// Validate a settlement placement
pub fn validate_settlement(
    board: &Board,
    player: &Player,
    vertex: &VertexCoord,
    context: SettlementContext,
) -> Result<(), GameError> {
    if !board.contains_vertex(vertex) {
        return Err(GameError::InvalidTarget(format!("vertex {vertex} is not on the board")));
    }
    if board.building_at(vertex) != VertexBuilding::Empty {
        return Err(GameError::Occupied);
    }
    if player.settlements_remaining == 0 {
        return Err(GameError::InsufficientInventory);
    }
    if !satisfies_distance_rule(board, vertex) {
        return Err(GameError::TooClose);
    }
    if context == SettlementContext::Normal && !board.has_road_at_vertex(vertex, player.id) {
        return Err(GameError::Disconnected);
    }
    Ok(())
}

/// Validate upgrading a settlement to a city
pub fn validate_city(
    board: &Board,
    player: &Player,
    vertex: &VertexCoord,
) -> Result<(), GameError> {
    if !board.contains_vertex(vertex) {
        return Err(GameError::InvalidTarget(format!("vertex {vertex} is not on the board")));
    }
    if board.building_at(vertex) != VertexBuilding::Settlement(player.id) {
        return Err(GameError::InvalidTarget(format!("no settlement of yours at {vertex}")));
    }
    if player.cities_remaining == 0 {
        return Err(GameError::InsufficientInventory);
    }
    Ok(())
}

/// Validate a road placement
pub fn validate_road(
    board: &Board,
    player: &Player,
    edge: &EdgeCoord,
    context: RoadContext,
) -> Result<(), GameError> {
    if !board.contains_edge(edge) {
        return Err(GameError::InvalidTarget(format!("edge {edge} is not on the board")));
    }
    if board.road_at(edge) != EdgeBuilding::Empty {
        return Err(GameError::Occupied);
    }
    if player.roads_remaining == 0 {
        return Err(GameError::InsufficientInventory);
    }
    let connected = match context {
        RoadContext::Setup { settlement } => edge.touches(&settlement),
        RoadContext::FreeRoad | RoadContext::Paid => {
            is_connected_to_network(board, edge, player.id)
        }
    };
    if !connected {
        return Err(GameError::Disconnected);
    }
    Ok(())
}

/// Whether an edge extends the player's network: an own building at an
/// endpoint, or another own road through either endpoint
fn is_connected_to_network(board: &Board, edge: &EdgeCoord, player: PlayerId) -> bool {
    edge.endpoints().iter().any(|endpoint| {
        if board.building_at(endpoint).owner() == Some(player) {
            return true;
        }
        endpoint
            .touching_edges()
            .iter()
            .any(|adj| adj != edge && board.road_at(adj) == EdgeBuilding::Road(player))
    })
}

// ==================== Enumerators ====================

/// Every vertex where the player could legally settle
pub fn valid_settlement_spots(
    board: &Board,
    player: &Player,
    context: SettlementContext,
) -> Vec<VertexCoord> {
    board
        .vertices()
        .map(|(vertex, _)| *vertex)
        .filter(|v| validate_settlement(board, player, v, context).is_ok())
        .collect()
}

/// Every edge where the player could legally build a road
pub fn valid_road_spots(board: &Board, player: &Player, context: RoadContext) -> Vec<EdgeCoord> {
    board
        .edges()
        .map(|(edge, _)| *edge)
        .filter(|e| validate_road(board, player, e, context).is_ok())
        .collect()
}

/// Every settlement the player could upgrade
pub fn valid_city_spots(board: &Board, player: &Player) -> Vec<VertexCoord> {
    board
        .vertices()
        .filter(|(_, building)| **building == VertexBuilding::Settlement(player.id))
        .map(|(vertex, _)| *vertex)
        .filter(|v| validate_city(board, player, v).is_ok())
        .collect()
}
