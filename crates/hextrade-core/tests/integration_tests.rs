//! Integration tests for the Hextrade game engine.
//!
//! These tests drive complete game flows through the public API, from the
//! lobby through setup and into regular turns.

use hextrade_core::placement::{
    valid_road_spots, valid_settlement_spots, RoadContext, SettlementContext,
};
use hextrade_core::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn new_game(config: GameConfig, players: usize, seed: u64) -> GameState {
    let mut game = GameState::new_with_rng(config, &mut seeded(seed));
    for i in 0..players {
        game.add_player(format!("Player {}", i + 1)).unwrap();
    }
    game.start_game_with_rng(&mut seeded(seed)).unwrap();
    game
}

/// Run through complete setup phase with the first legal placements
fn complete_setup(game: &mut GameState) {
    let mut iterations = 0;
    let max_iterations = 24;

    while game.phase == GamePhase::Setup && iterations < max_iterations {
        let id = game.acting_player_id().unwrap();
        let player = game.player(id).unwrap().clone();
        let vertex = valid_settlement_spots(&game.board, &player, SettlementContext::Setup)[0];
        game.place_settlement(id, vertex).unwrap();

        let player = game.player(id).unwrap().clone();
        let context = RoadContext::Setup { settlement: vertex };
        let edge = valid_road_spots(&game.board, &player, context)[0];
        game.place_road(id, edge).unwrap();
        iterations += 1;
    }

    assert_eq!(game.phase, GamePhase::Playing, "setup should finish");
}

fn playing_game(players: usize, seed: u64) -> GameState {
    let mut game = new_game(GameConfig::standard(), players, seed);
    complete_setup(&mut game);
    game
}

fn set_hand(game: &mut GameState, id: PlayerId, hand: ResourceHand) {
    let player = game.players.iter_mut().find(|p| p.id == id).unwrap();
    player.resources = hand;
}

/// Roll until the dice show the wanted total, restarting from a clone each time
fn roll_until(game: &GameState, total: u8) -> (GameState, Vec<GameEvent>) {
    let id = game.current_player_id().unwrap();
    for seed in 0..10_000 {
        let mut attempt = game.clone();
        let events = attempt.roll_dice_with_rng(id, &mut seeded(seed)).unwrap();
        if matches!(events[0], GameEvent::DiceRolled { total: t, .. } if t == total) {
            return (attempt, events);
        }
    }
    panic!("no seed rolled {total}");
}

/// Get every player back to `Main` after a roll
fn resolve_robber(game: &mut GameState) {
    for (player, owed) in game.pending_discards.clone() {
        let hand = game.player(player).unwrap().resources;
        let mut discard = ResourceHand::new();
        let mut remaining = owed;
        for (resource, count) in hand.iter() {
            let take = count.min(remaining);
            discard.add(resource, take);
            remaining -= take;
        }
        game.discard_cards(player, discard).unwrap();
    }
    if game.turn_phase == TurnPhase::Robber {
        let id = game.current_player_id().unwrap();
        let target = game.board.hexes().find(|t| t.coord != game.board.robber()).unwrap().coord;
        game.move_robber(id, target, None).unwrap();
    }
}

/// Play the forward setup round with first legal placements
fn complete_forward_round(game: &mut GameState) {
    while game.setup_round == SetupRound::Forward {
        let id = game.acting_player_id().unwrap();
        let player = game.player(id).unwrap().clone();
        let vertex = valid_settlement_spots(&game.board, &player, SettlementContext::Setup)[0];
        game.place_settlement(id, vertex).unwrap();
        let player = game.player(id).unwrap().clone();
        let context = RoadContext::Setup { settlement: vertex };
        let edge = valid_road_spots(&game.board, &player, context)[0];
        game.place_road(id, edge).unwrap();
    }
}

/// A legal reverse-round corner touching exactly one forest and one hills tile
fn forest_hills_corner(game: &GameState) -> Option<VertexCoord> {
    let id = game.acting_player_id()?;
    let player = game.player(id)?;
    valid_settlement_spots(&game.board, player, SettlementContext::Setup)
        .into_iter()
        .find(|v| {
            let terrains: Vec<Terrain> =
                game.board.hexes_at_vertex(v).iter().map(|t| t.terrain).collect();
            terrains.len() == 2
                && terrains.contains(&Terrain::Forest)
                && terrains.contains(&Terrain::Hills)
        })
}

#[test]
fn test_start_order_is_a_permutation() {
    let game = new_game(GameConfig::standard(), 4, 11);
    let mut ids: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
    let orders: Vec<u8> = game.players.iter().map(|p| p.turn_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);

    ids.sort();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(game.phase, GamePhase::Setup);
    assert_eq!(game.setup_round, SetupRound::Forward);
}

#[test]
fn test_setup_phase_completes() {
    let game = playing_game(4, 5);
    assert_eq!(game.turn_phase, TurnPhase::Roll);
    assert_eq!(game.turn_number, 1);
    for player in &game.players {
        assert_eq!(player.victory_points, 2);
        assert_eq!(game.board.roads_of(player.id).len(), 2);
    }
}

#[test]
fn test_second_settlement_bonus() {
    // Find a dealt board with a free forest/hills corner after the forward round
    let (mut game, vertex) = (0..500)
        .find_map(|seed| {
            let mut game = new_game(GameConfig::standard(), 2, seed);
            complete_forward_round(&mut game);
            forest_hills_corner(&game).map(|v| (game, v))
        })
        .expect("some board has a forest/hills corner");
    assert_eq!(game.setup_round, SetupRound::Reverse);

    let id = game.acting_player_id().unwrap();
    let before = game.player(id).unwrap().resources;
    let events = game.place_settlement(id, vertex).unwrap();

    let bonus = ResourceHand::with_amounts(1, 1, 0, 0, 0);
    assert!(events.contains(&GameEvent::SetupResourcesGranted {
        player: id,
        resources: bonus
    }));
    let mut after = before;
    after.add_hand(&bonus);
    assert_eq!(game.player(id).unwrap().resources, after);
}

#[test]
fn test_seven_forces_discard_of_half() {
    let mut game = playing_game(3, 2);
    let holder = game.players[1].id;
    set_hand(&mut game, holder, ResourceHand::with_amounts(3, 2, 2, 1, 1));

    let (mut game, events) = roll_until(&game, 7);
    assert_eq!(game.turn_phase, TurnPhase::Discard);
    assert!(events.contains(&GameEvent::DiscardRequired {
        obligations: vec![(holder, 4)]
    }));

    let view = game.view_for(holder);
    assert_eq!(view.pending_discards.get(&holder), Some(&4));

    game.discard_cards(holder, ResourceHand::with_amounts(3, 1, 0, 0, 0)).unwrap();
    assert_eq!(game.turn_phase, TurnPhase::Robber);
    assert_eq!(game.player(holder).unwrap().resources.total(), 5);
}

#[test]
fn test_normal_turn_flow() {
    let game = playing_game(2, 9);
    let first = game.current_player_id().unwrap();
    let (mut game, _) = roll_until(&game, 8);
    assert_eq!(game.turn_phase, TurnPhase::Main);

    let events = game.end_turn(first).unwrap();
    let second = game.current_player_id().unwrap();
    assert_ne!(first, second);
    assert_eq!(
        events,
        vec![GameEvent::TurnEnded {
            player: first,
            next_player: second
        }]
    );
    assert_eq!(game.roll_dice(first), Err(GameError::NotYourTurn));
}

#[test]
fn test_roll_pays_producing_hexes() {
    let game = playing_game(4, 13);
    let mut expected = game.clone();
    let (game, events) = roll_until(&game, 6);

    let gains = distribution::distribute(&expected.board, 6);
    for gain in &gains {
        let player = expected.players.iter_mut().find(|p| p.id == gain.player).unwrap();
        player.resources.add(gain.resource, gain.amount);
    }
    for (before, after) in expected.players.iter().zip(&game.players) {
        assert_eq!(before.resources, after.resources);
    }
    if !gains.is_empty() {
        assert!(events.contains(&GameEvent::ResourcesDistributed { gains }));
    }
}

#[test]
fn test_brick_port_trade() {
    let game = playing_game(2, 4);
    let (mut game, _) = roll_until(&game, 5);
    resolve_robber(&mut game);
    let id = game.current_player_id().unwrap();

    let port = *game
        .board
        .ports()
        .iter()
        .find(|p| p.kind == PortKind::Specific(Resource::Brick))
        .unwrap();
    game.board.place_settlement(port.vertices[0], id);
    set_hand(&mut game, id, ResourceHand::single(Resource::Brick, 3));

    assert_eq!(
        game.bank_trade(id, Resource::Brick, 3, Resource::Ore),
        Err(GameError::RatioMismatch {
            expected: 2,
            offered: 3
        })
    );
    game.bank_trade(id, Resource::Brick, 2, Resource::Ore).unwrap();
    assert_eq!(
        game.player(id).unwrap().resources,
        ResourceHand::with_amounts(1, 0, 1, 0, 0)
    );
}

#[test]
fn test_monopoly_on_ore() {
    let game = playing_game(3, 6);
    let (mut game, _) = roll_until(&game, 9);
    resolve_robber(&mut game);
    let id = game.current_player_id().unwrap();
    let ids: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();

    for other in &ids {
        set_hand(&mut game, *other, ResourceHand::single(Resource::Ore, 2));
    }
    let player = game.players.iter_mut().find(|p| p.id == id).unwrap();
    player.dev_cards.push(DevelopmentCard::Monopoly);

    game.apply_action(id, GameAction::PlayMonopoly(Resource::Ore)).unwrap();
    assert_eq!(game.player(id).unwrap().resources.ore, 6);
    for other in ids.iter().filter(|p| **p != id) {
        assert_eq!(game.player(*other).unwrap().resources.ore, 0);
    }
    assert_eq!(
        game.apply_action(id, GameAction::PlayMonopoly(Resource::Ore)),
        Err(GameError::DevCardAlreadyPlayed)
    );
}

#[test]
fn test_development_card_purchase() {
    let game = playing_game(2, 17);
    let (mut game, _) = roll_until(&game, 4);
    resolve_robber(&mut game);
    let id = game.current_player_id().unwrap();

    set_hand(&mut game, id, ResourceHand::new());
    assert_eq!(game.buy_development_card(id), Err(GameError::InsufficientResources));

    set_hand(&mut game, id, ResourceHand::with_amounts(0, 0, 1, 1, 1));
    game.buy_development_card(id).unwrap();
    assert_eq!(game.deck_remaining(), 24);
    assert_eq!(game.player(id).unwrap().dev_card_count(), 1);
    assert!(game.player(id).unwrap().resources.is_empty());
}

#[test]
fn test_spelling_does_not_change_outcome() {
    let mut game = new_game(GameConfig::standard(), 2, 21);
    let id = game.acting_player_id().unwrap();
    let vertex = VertexCoord::new(HexCoord::new(0, 0), VertexDirection::North);

    // Place under one spelling, then every spelling is occupied
    game.place_settlement(id, vertex.equivalents()[2]).unwrap();
    let edge = EdgeCoord::new(HexCoord::new(0, 0), EdgeDirection::NorthEast);
    game.place_road(id, edge.equivalents()[1]).unwrap();

    let next = game.acting_player_id().unwrap();
    for spelling in vertex.equivalents() {
        assert_eq!(game.place_settlement(next, spelling), Err(GameError::Occupied));
        assert_eq!(game.board.building_at(&spelling), VertexBuilding::Settlement(id));
    }
    for neighbour in vertex.adjacent_vertices() {
        for spelling in neighbour.equivalents() {
            assert_eq!(game.place_settlement(next, spelling), Err(GameError::TooClose));
        }
    }
    for spelling in edge.equivalents() {
        assert_eq!(game.board.road_at(&spelling), EdgeBuilding::Road(id));
    }
}

#[test]
fn test_longest_road_threshold_and_idempotence() {
    let mut game = playing_game(2, 30);
    let id = game.players[0].id;

    // A hex with no buildings on any corner
    let hex = game
        .board
        .hexes()
        .map(|t| t.coord)
        .find(|h| h.vertices().iter().all(|v| game.board.building_at(v) == VertexBuilding::Empty))
        .unwrap();

    // Four sides don't qualify unless they join the setup roads
    for edge in hex.edges().iter().take(4) {
        game.board.place_road(*edge, id);
    }
    game.update_longest_road();
    let four = longest_road_length(&game.board, id);
    if four < 5 {
        assert_eq!(game.longest_road.holder, None);
    }

    for edge in hex.edges() {
        game.board.place_road(edge, id);
    }
    let first = game.update_longest_road();
    let holder = game.longest_road.holder;
    assert!(holder.is_some());
    let points = game.players.iter().map(|p| p.victory_points).collect::<Vec<_>>();

    // Recomputing without board changes is a no-op
    assert!(game.update_longest_road().is_empty());
    assert_eq!(game.longest_road.holder, holder);
    assert_eq!(game.players.iter().map(|p| p.victory_points).collect::<Vec<_>>(), points);
    if holder == Some(id) {
        assert!(first.iter().any(
            |e| matches!(e, GameEvent::LongestRoadChanged { current, .. } if *current == Some(id))
        ));
        assert!(game.player(id).unwrap().has_longest_road);
    }
}

#[test]
fn test_views_hide_opponent_hands() {
    let mut game = playing_game(3, 40);
    let ids: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
    set_hand(&mut game, ids[1], ResourceHand::with_amounts(1, 1, 1, 1, 1));

    let view = game.view_for(ids[0]);
    assert_eq!(view.players[1].hand, HandView::Hidden { total: 5 });
    let own = game.view_for(ids[1]);
    assert_eq!(own.players[1].hand, HandView::Visible(ResourceHand::with_amounts(1, 1, 1, 1, 1)));
}

#[test]
fn test_random_game_simulation() {
    let mut game = playing_game(4, 77);
    let mut rng = seeded(77);

    for _ in 0..40 {
        let id = game.current_player_id().unwrap();
        game.roll_dice_with_rng(id, &mut rng).unwrap();
        resolve_robber(&mut game);
        assert_eq!(game.turn_phase, TurnPhase::Main);

        let player = game.player(id).unwrap().clone();
        if player.resources.can_afford(&hextrade_core::player::costs::road()) {
            if let Some(edge) = valid_road_spots(&game.board, &player, RoadContext::Paid).first() {
                game.place_road(id, *edge).unwrap();
            }
        }
        if game.is_finished() {
            break;
        }
        game.end_turn(id).unwrap();
    }

    // Resources are conserved as non-negative counters and inventories never overflow
    for player in &game.players {
        assert!(player.roads_remaining <= 13);
        assert_eq!(game.board.roads_of(player.id).len() as u32, 15 - player.roads_remaining);
    }
}
