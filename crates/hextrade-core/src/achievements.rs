//! Longest Road and Largest Army tracking.
//!
//! Both titles share one holder rule, see [`resolve_holder`]. The turn engine
//! calls [`GameState::update_longest_road`] after every road or settlement and
//! [`GameState::update_largest_army`] after every knight.

use crate::actions::GameEvent;
use crate::board::{Board, EdgeBuilding, PlayerId};
use crate::game::GameState;
use crate::hex::{EdgeCoord, VertexCoord};
use crate::player::Player;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum road length for Longest Road
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Victory points a title is worth
const TITLE_POINTS: u32 = 2;

/// Current holder of a title and the score that earned it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub holder: Option<PlayerId>,
    pub magnitude: u32,
}

/// Decide who holds a title given every player's score.
///
/// - nobody qualifies below `minimum`
/// - the current holder keeps it while tied for the lead
/// - a unique leader takes it
/// - a tie that excludes the current holder leaves it vacant
pub fn resolve_holder(
    scores: &[(PlayerId, u32)],
    current: Option<PlayerId>,
    minimum: u32,
) -> Option<PlayerId> {
    let best = scores.iter().map(|(_, score)| *score).max()?;
    if best < minimum {
        return None;
    }
    let leaders: Vec<PlayerId> = scores
        .iter()
        .filter(|(_, score)| *score == best)
        .map(|(player, _)| *player)
        .collect();

    match current {
        Some(holder) if leaders.contains(&holder) => Some(holder),
        _ if leaders.len() == 1 => Some(leaders[0]),
        _ => None,
    }
}

// ==================== Longest Road ====================

/// Length of the player's longest continuous road.
///
/// Every owned edge is tried as a start in both directions. A path only ever
/// grows from its far end, and may not pass through a corner an opponent has
/// built on. Edges are used at most once per path, so loops count fully.
pub fn longest_road_length(board: &Board, player: PlayerId) -> u32 {
    let roads = board.roads_of(player);
    let mut best = 0;
    let mut path: Vec<EdgeCoord> = Vec::with_capacity(roads.len());

    for edge in &roads {
        for far in edge.endpoints() {
            path.push(*edge);
            best = best.max(extend(board, player, far, &mut path));
            path.pop();
        }
    }
    best
}

fn extend(board: &Board, player: PlayerId, at: VertexCoord, path: &mut Vec<EdgeCoord>) -> u32 {
    let mut best = path.len() as u32;

    let blocker = board.building_at(&at).owner();
    if blocker.is_some_and(|owner| owner != player) {
        return best;
    }

    for next in at.touching_edges() {
        if path.contains(&next) || board.road_at(&next) != EdgeBuilding::Road(player) {
            continue;
        }
        let Some(far) = next.endpoints().into_iter().find(|v| *v != at) else {
            continue;
        };
        path.push(next);
        best = best.max(extend(board, player, far, path));
        path.pop();
    }
    best
}

// ==================== Title Updates ====================

impl GameState {
    /// Recompute every road length and reassign Longest Road
    pub fn update_longest_road(&mut self) -> Vec<GameEvent> {
        let scores: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, longest_road_length(&self.board, p.id)))
            .collect();
        for (player, (_, length)) in self.players.iter_mut().zip(&scores) {
            player.longest_road = *length;
        }

        let previous = self.longest_road.holder;
        let holder = resolve_holder(&scores, previous, MIN_LONGEST_ROAD);
        let length = score_of(&scores, holder);
        self.longest_road = Achievement {
            holder,
            magnitude: length,
        };
        if holder == previous {
            return Vec::new();
        }

        debug!(?previous, ?holder, length, "longest road changed");
        self.move_title(previous, holder, |p, held| p.has_longest_road = held);

        let mut events = vec![GameEvent::LongestRoadChanged {
            previous,
            current: holder,
            length,
        }];
        events.extend(self.check_victory());
        events
    }

    /// Reassign Largest Army from knight counts
    pub fn update_largest_army(&mut self) -> Vec<GameEvent> {
        let scores: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, p.played_knights))
            .collect();

        let previous = self.largest_army.holder;
        let holder = resolve_holder(&scores, previous, MIN_LARGEST_ARMY);
        let knights = score_of(&scores, holder);
        self.largest_army = Achievement {
            holder,
            magnitude: knights,
        };
        if holder == previous {
            return Vec::new();
        }

        debug!(?previous, ?holder, knights, "largest army changed");
        self.move_title(previous, holder, |p, held| p.has_largest_army = held);

        let mut events = vec![GameEvent::LargestArmyChanged {
            previous,
            current: holder,
            knights,
        }];
        events.extend(self.check_victory());
        events
    }

    /// Apply the flag and point changes of a title changing hands
    fn move_title(
        &mut self,
        previous: Option<PlayerId>,
        holder: Option<PlayerId>,
        set_flag: impl Fn(&mut Player, bool),
    ) {
        for player in &mut self.players {
            if Some(player.id) == previous {
                set_flag(player, false);
                player.victory_points = player.victory_points.saturating_sub(TITLE_POINTS);
            }
            if Some(player.id) == holder {
                set_flag(player, true);
                player.victory_points += TITLE_POINTS;
            }
        }
    }
}

fn score_of(scores: &[(PlayerId, u32)], player: Option<PlayerId>) -> u32 {
    player
        .and_then(|id| scores.iter().find(|(p, _)| *p == id))
        .map_or(0, |(_, score)| *score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoardSize, GameConfig};
    use crate::game::{GamePhase, TurnPhase};
    use crate::hex::{EdgeDirection, HexCoord};
    use crate::player::DevelopmentCard;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> Board {
        Board::generate(BoardSize::Standard, &mut StdRng::seed_from_u64(33))
    }

    /// Three players mid-game with no buildings and no points
    fn game() -> GameState {
        let mut rng = StdRng::seed_from_u64(33);
        let mut game = GameState::new_with_rng(GameConfig::standard(), &mut rng);
        for name in ["A", "B", "C"] {
            game.add_player(name).unwrap();
        }
        game.start_game_with_rng(&mut rng).unwrap();
        game.phase = GamePhase::Playing;
        game.turn_phase = TurnPhase::Roll;
        game
    }

    /// Hand a knight to the player at `index` and play it on their turn
    fn play_knight_as(game: &mut GameState, index: usize) -> Vec<GameEvent> {
        game.current_player = index;
        game.turn_phase = TurnPhase::Roll;
        game.dev_card_played = false;
        game.players[index].dev_cards.push(DevelopmentCard::Knight);
        let id = game.players[index].id;
        game.play_knight(id).unwrap()
    }

    fn points(game: &GameState) -> Vec<u32> {
        game.players.iter().map(|p| p.victory_points).collect()
    }

    fn ring(hex: HexCoord) -> [EdgeCoord; 6] {
        hex.edges()
    }

    #[test]
    fn test_resolve_holder_rules() {
        // Below minimum
        assert_eq!(resolve_holder(&[(0, 4), (1, 3)], None, 5), None);
        assert_eq!(resolve_holder(&[(0, 4), (1, 3)], Some(0), 5), None);
        // Unique leader
        assert_eq!(resolve_holder(&[(0, 5), (1, 3)], None, 5), Some(0));
        // Holder keeps on tie
        assert_eq!(resolve_holder(&[(0, 6), (1, 6)], Some(0), 5), Some(0));
        // Transfer to a strict new leader
        assert_eq!(resolve_holder(&[(0, 6), (1, 7)], Some(0), 5), Some(1));
        // Tie excluding holder vacates
        assert_eq!(resolve_holder(&[(0, 5), (1, 7), (2, 7)], Some(0), 5), None);
        // Tie with no holder stays vacant
        assert_eq!(resolve_holder(&[(1, 7), (2, 7)], None, 5), None);
        assert_eq!(resolve_holder(&[], None, 5), None);
    }

    #[test]
    fn test_straight_road_length() {
        let mut board = board();
        let hex = HexCoord::new(0, 0);
        // Five consecutive sides of one hex
        for edge in ring(hex).iter().take(5) {
            board.place_road(*edge, 0);
        }
        assert_eq!(longest_road_length(&board, 0), 5);
        assert_eq!(longest_road_length(&board, 1), 0);
    }

    #[test]
    fn test_loop_counts_every_edge_once() {
        let mut board = board();
        for edge in ring(HexCoord::new(0, 0)) {
            board.place_road(edge, 0);
        }
        assert_eq!(longest_road_length(&board, 0), 6);
    }

    #[test]
    fn test_fork_counts_single_branch() {
        let mut board = board();
        let hex = HexCoord::new(0, 0);
        // Three sides in a row: NE, E, SE
        board.place_road(EdgeCoord::new(hex, EdgeDirection::NorthEast), 0);
        board.place_road(EdgeCoord::new(hex, EdgeDirection::East), 0);
        board.place_road(EdgeCoord::new(hex, EdgeDirection::SouthEast), 0);
        // A spur off the north-east corner, leaving the hex
        let corner = hex.vertices()[1];
        let spur = corner
            .touching_edges()
            .into_iter()
            .find(|e| board.road_at(e) == EdgeBuilding::Empty)
            .unwrap();
        board.place_road(spur, 0);
        // spur + E + SE, or NE + E + SE; never all four
        assert_eq!(longest_road_length(&board, 0), 3);
    }

    #[test]
    fn test_opponent_settlement_breaks_road() {
        let mut board = board();
        let hex = HexCoord::new(0, 0);
        for edge in ring(hex).iter().take(5) {
            board.place_road(*edge, 0);
        }
        // Corner between sides 1 and 2
        board.place_settlement(hex.vertices()[2], 1);
        assert_eq!(longest_road_length(&board, 0), 3);

        // Own buildings never break it
        let mut own = self::board();
        for edge in ring(hex).iter().take(5) {
            own.place_road(*edge, 0);
        }
        own.place_settlement(hex.vertices()[2], 0);
        assert_eq!(longest_road_length(&own, 0), 5);
    }

    #[test]
    fn test_spelling_does_not_matter() {
        let mut board = board();
        let hex = HexCoord::new(0, 0);
        // Store each road under its neighbour's spelling
        for edge in ring(hex).iter().take(4) {
            board.place_road(edge.equivalents()[1], 0);
        }
        assert_eq!(longest_road_length(&board, 0), 4);
    }

    #[test]
    fn test_largest_army_threshold_and_transfer() {
        let mut game = game();
        let a = game.players[0].id;
        let b = game.players[1].id;

        play_knight_as(&mut game, 0);
        play_knight_as(&mut game, 0);
        assert_eq!(game.largest_army, Achievement::default());

        // Third knight earns the title
        let events = play_knight_as(&mut game, 0);
        assert!(events.contains(&GameEvent::LargestArmyChanged {
            previous: None,
            current: Some(a),
            knights: 3,
        }));
        assert_eq!(game.largest_army, Achievement { holder: Some(a), magnitude: 3 });
        assert!(game.players[0].has_largest_army);
        assert_eq!(points(&game), vec![2, 0, 0]);

        // Catching up is not enough
        for _ in 0..3 {
            play_knight_as(&mut game, 1);
        }
        assert_eq!(game.largest_army.holder, Some(a));
        assert_eq!(points(&game), vec![2, 0, 0]);

        // Overtaking moves both the flag and the points
        let events = play_knight_as(&mut game, 1);
        assert!(events.contains(&GameEvent::LargestArmyChanged {
            previous: Some(a),
            current: Some(b),
            knights: 4,
        }));
        assert!(!game.players[0].has_largest_army);
        assert!(game.players[1].has_largest_army);
        assert_eq!(points(&game), vec![0, 2, 0]);
    }

    #[test]
    fn test_largest_army_can_win_the_game() {
        let mut game = game();
        let a = game.players[0].id;
        game.players[0].victory_points = 8;

        play_knight_as(&mut game, 0);
        play_knight_as(&mut game, 0);
        let events = play_knight_as(&mut game, 0);

        assert!(events.contains(&GameEvent::GameWon {
            player: a,
            victory_points: 10,
        }));
        assert_eq!(game.phase, GamePhase::Finished);
        assert_eq!(game.winner, Some(a));
    }

    #[test]
    fn test_longest_road_transfer_and_tie_vacate() {
        let mut game = game();
        let (a, b, c) = (game.players[0].id, game.players[1].id, game.players[2].id);
        let home = HexCoord::new(0, 0);
        let east = HexCoord::new(2, -2);
        let west = HexCoord::new(-2, 2);

        for edge in ring(home).iter().take(5) {
            game.board.place_road(*edge, a);
        }
        let events = game.update_longest_road();
        assert_eq!(
            events,
            vec![GameEvent::LongestRoadChanged {
                previous: None,
                current: Some(a),
                length: 5,
            }]
        );
        assert_eq!(points(&game), vec![2, 0, 0]);

        // A closed loop of six beats a straight five
        for edge in ring(east) {
            game.board.place_road(edge, b);
        }
        game.update_longest_road();
        assert_eq!(game.longest_road, Achievement { holder: Some(b), magnitude: 6 });
        assert!(!game.players[0].has_longest_road);
        assert!(game.players[1].has_longest_road);
        assert_eq!(points(&game), vec![0, 2, 0]);

        // Ties with the holder change nothing
        for edge in ring(west) {
            game.board.place_road(edge, c);
        }
        game.board.place_road(ring(home)[5], a);
        assert!(game.update_longest_road().is_empty());
        assert_eq!(game.longest_road.holder, Some(b));

        // Cutting the holder's loop twice leaves a tie it is not part of
        game.board.place_settlement(east.vertices()[0], a);
        game.board.place_settlement(east.vertices()[3], c);
        let events = game.update_longest_road();
        assert_eq!(
            events,
            vec![GameEvent::LongestRoadChanged {
                previous: Some(b),
                current: None,
                length: 0,
            }]
        );
        assert_eq!(game.players[1].longest_road, 3);
        assert_eq!(game.longest_road, Achievement::default());
        assert!(game.players.iter().all(|p| !p.has_longest_road));
        assert_eq!(points(&game), vec![0, 0, 0]);
    }

    #[test]
    fn test_longest_road_lost_below_minimum() {
        let mut game = game();
        let a = game.players[0].id;
        let home = HexCoord::new(0, 0);
        for edge in ring(home).iter().take(5) {
            game.board.place_road(*edge, a);
        }
        game.update_longest_road();
        assert_eq!(points(&game), vec![2, 0, 0]);

        game.board.place_settlement(home.vertices()[2], game.players[1].id);
        game.update_longest_road();
        assert_eq!(game.players[0].longest_road, 3);
        assert_eq!(game.longest_road.holder, None);
        assert!(!game.players[0].has_longest_road);
        assert_eq!(points(&game), vec![0, 0, 0]);
    }
}
