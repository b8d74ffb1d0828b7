//! Resource production for a dice roll and the second setup settlement.

use crate::board::{Board, PlayerId, Resource};
use crate::hex::{HexCoord, VertexCoord};
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Resources credited to one player for one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGain {
    pub player: PlayerId,
    pub resource: Resource,
    pub amount: u32,
}

/// Compute every player's production for a roll total.
///
/// Each (hex, corner) pair pays at most once, but a corner shared by several
/// matching hexes is paid once per hex. The robber's hex produces nothing.
pub fn distribute(board: &Board, roll: u8) -> Vec<ResourceGain> {
    let mut paid: BTreeSet<(HexCoord, VertexCoord)> = BTreeSet::new();
    let mut totals: BTreeMap<(PlayerId, Resource), u32> = BTreeMap::new();

    for tile in board.hexes() {
        if tile.token != Some(roll) || tile.coord == board.robber() {
            continue;
        }
        let Some(resource) = tile.resource() else {
            continue;
        };

        for vertex in tile.coord.vertices() {
            let building = board.building_at(&vertex);
            let Some(owner) = building.owner() else {
                continue;
            };
            if paid.insert((tile.coord, vertex.canonical())) {
                *totals.entry((owner, resource)).or_default() += building.resource_multiplier();
            }
        }
    }

    totals
        .into_iter()
        .map(|((player, resource), amount)| ResourceGain {
            player,
            resource,
            amount,
        })
        .collect()
}

/// One of each resource produced by the land hexes around a corner
pub fn setup_bonus(board: &Board, vertex: &VertexCoord) -> ResourceHand {
    let mut hand = ResourceHand::new();
    for tile in board.hexes_at_vertex(vertex) {
        if let Some(resource) = tile.resource() {
            hand.add(resource, 1);
        }
    }
    hand
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Terrain;
    use crate::config::BoardSize;
    use crate::hex::VertexDirection;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> Board {
        Board::generate(BoardSize::Standard, &mut StdRng::seed_from_u64(21))
    }

    /// A producing hex that isn't under the robber
    fn producing_tile(board: &Board) -> (HexCoord, u8, Resource) {
        board
            .hexes()
            .find_map(|t| {
                let resource = t.resource()?;
                let token = t.token?;
                (t.coord != board.robber()).then_some((t.coord, token, resource))
            })
            .unwrap()
    }

    fn gains_for(gains: &[ResourceGain], player: PlayerId, resource: Resource) -> u32 {
        gains
            .iter()
            .filter(|g| g.player == player && g.resource == resource)
            .map(|g| g.amount)
            .sum()
    }

    #[test]
    fn test_settlement_and_city_multipliers() {
        let mut board = board();
        let (hex, token, resource) = producing_tile(&board);
        board.place_settlement(VertexCoord::new(hex, VertexDirection::North), 0);
        board.place_settlement(VertexCoord::new(hex, VertexDirection::South), 1);
        board.upgrade_to_city(VertexCoord::new(hex, VertexDirection::South), 1);

        let gains = distribute(&board, token);
        assert!(gains_for(&gains, 0, resource) >= 1);
        assert!(gains_for(&gains, 1, resource) >= 2);
    }

    #[test]
    fn test_shared_corner_pays_once_per_hex() {
        let mut board = board();
        let vertex = VertexCoord::new(HexCoord::new(0, 0), VertexDirection::North);
        board.place_settlement(vertex, 2);

        for roll in 2..=12u8 {
            let gains = distribute(&board, roll);
            let expected: u32 = board
                .hexes_at_vertex(&vertex)
                .iter()
                .filter(|t| t.token == Some(roll) && t.coord != board.robber())
                .filter(|t| t.resource().is_some())
                .count() as u32;
            let received: u32 = gains.iter().map(|g| g.amount).sum();
            assert_eq!(received, expected, "roll {roll}");
        }
    }

    #[test]
    fn test_robber_blocks_production() {
        let mut board = board();
        let (hex, token, resource) = producing_tile(&board);
        board.place_settlement(VertexCoord::new(hex, VertexDirection::North), 0);
        let before = gains_for(&distribute(&board, token), 0, resource);
        assert!(before >= 1);

        board.move_robber(hex);
        let after = gains_for(&distribute(&board, token), 0, resource);
        assert_eq!(after, before - 1);
    }

    #[test]
    fn test_no_production_without_buildings() {
        let board = board();
        for roll in 2..=12u8 {
            assert!(distribute(&board, roll).is_empty());
        }
    }

    #[test]
    fn test_setup_bonus_counts_each_land_hex() {
        let board = board();
        let vertex = VertexCoord::new(HexCoord::new(0, 0), VertexDirection::North);
        let bonus = setup_bonus(&board, &vertex);
        let producing = board
            .hexes_at_vertex(&vertex)
            .iter()
            .filter(|t| t.terrain != Terrain::Desert)
            .count() as u32;
        assert_eq!(bonus.total(), producing);
    }
}
