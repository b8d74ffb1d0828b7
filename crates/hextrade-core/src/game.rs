//! Core game state machine.
//!
//! This module contains the main `GameState` struct and every operation that
//! changes it. Each operation checks the game phase, the actor and its inputs
//! before touching anything, so an `Err` always leaves the game untouched.

use crate::achievements::Achievement;
use crate::actions::{GameAction, GameEvent, TradeOffer};
use crate::board::{Board, PlayerId, PortKind, Resource};
use crate::config::GameConfig;
use crate::distribution::{distribute, setup_bonus};
use crate::error::GameError;
use crate::hex::{EdgeCoord, HexCoord, VertexCoord};
use crate::placement::{
    validate_city, validate_road, validate_settlement, RoadContext, SettlementContext,
};
use crate::player::{costs, DevelopmentCard, Player, PlayerColor, ResourceHand};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Hand size above which a 7 forces a discard
const DISCARD_LIMIT: u32 = 7;

/// Coarse game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Lobby: players may join and leave
    Waiting,
    /// Two rounds of opening placements
    Setup,
    Playing,
    /// Terminal; every operation fails with `GameOver`
    Finished,
}

/// Step within a turn while `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Before rolling dice at start of turn
    Roll,
    /// Trading, building, playing cards
    Main,
    /// Robber must be moved
    Robber,
    /// Players over the hand limit must discard
    Discard,
    /// Other players take turns building after the active player ended
    SpecialBuild,
}

/// Which setup round is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupRound {
    /// First placement, in turn order
    Forward,
    /// Second placement, in reverse turn order
    Reverse,
}

/// An open trade offer and who has turned it down
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrade {
    pub offer: TradeOffer,
    pub rejected_by: Vec<PlayerId>,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: GameConfig,
    pub board: Board,
    /// All players; in turn order once the game has started
    pub players: Vec<Player>,
    /// Development card draw pile
    pub(crate) dev_card_deck: Vec<DevelopmentCard>,
    pub phase: GamePhase,
    pub turn_phase: TurnPhase,
    pub setup_round: SetupRound,
    /// Index into `players` of the active player
    pub current_player: usize,
    /// Index of the player holding the special build slot
    pub special_builder: Option<usize>,
    /// Settlement placed this setup turn, awaiting its road
    pub setup_settlement: Option<VertexCoord>,
    pub pending_trade: Option<PendingTrade>,
    /// Cards each player still owes after a 7
    pub pending_discards: BTreeMap<PlayerId, u32>,
    /// Turn number (starts at 1 once setup is over)
    pub turn_number: u32,
    /// Last dice roll
    pub dice_roll: Option<(u8, u8)>,
    /// Whether the active player has rolled this turn
    pub dice_rolled: bool,
    /// Whether a dev card has been played this turn
    pub dev_card_played: bool,
    /// Free roads left from Road Building
    pub free_roads: u8,
    /// Free bank picks left from Year of Plenty
    pub free_resources: u8,
    pub longest_road: Achievement,
    pub largest_army: Achievement,
    pub winner: Option<PlayerId>,
}

impl GameState {
    /// Create a new game waiting for players
    pub fn new(config: GameConfig) -> Self {
        Self::new_with_rng(config, &mut rand::thread_rng())
    }

    /// Create a new game with a provided RNG
    pub fn new_with_rng<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Self {
        let board = Board::generate(config.board_size, rng);
        let dev_card_deck = DevelopmentCard::shuffled_deck(config.board_size, rng);
        Self {
            config,
            board,
            players: Vec::new(),
            dev_card_deck,
            phase: GamePhase::Waiting,
            turn_phase: TurnPhase::Roll,
            setup_round: SetupRound::Forward,
            current_player: 0,
            special_builder: None,
            setup_settlement: None,
            pending_trade: None,
            pending_discards: BTreeMap::new(),
            turn_number: 0,
            dice_roll: None,
            dice_rolled: false,
            dev_card_played: false,
            free_roads: 0,
            free_resources: 0,
            longest_road: Achievement::default(),
            largest_army: Achievement::default(),
            winner: None,
        }
    }

    // ==================== Queries ====================

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by id
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The player whose turn it is, once the game has started
    pub fn current_player_id(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::Waiting => None,
            _ => self.players.get(self.current_player).map(|p| p.id),
        }
    }

    /// The player allowed to act right now (the special builder, if any)
    pub fn acting_player_id(&self) -> Option<PlayerId> {
        let index = self.special_builder.unwrap_or(self.current_player);
        match self.phase {
            GamePhase::Setup | GamePhase::Playing => self.players.get(index).map(|p| p.id),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    pub fn deck_remaining(&self) -> usize {
        self.dev_card_deck.len()
    }

    /// Best bank ratio for giving away `resource`
    pub fn trade_ratio(&self, player: PlayerId, resource: Resource) -> u32 {
        let ports = self.board.player_ports(player);
        if ports.contains(&PortKind::Specific(resource)) {
            2
        } else if ports.contains(&PortKind::Generic) {
            3
        } else {
            4
        }
    }

    /// Bank ratio per resource for a player
    pub fn trade_ratios(&self, player: PlayerId) -> BTreeMap<Resource, u32> {
        Resource::ALL
            .iter()
            .map(|&r| (r, self.trade_ratio(player, r)))
            .collect()
    }

    fn index_of(&self, id: PlayerId) -> Result<usize, GameError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| GameError::NotFound(format!("player {id}")))
    }

    fn ensure_not_over(&self) -> Result<(), GameError> {
        if self.phase == GamePhase::Finished {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    /// The actor must be the active player of a running game
    fn require_active(&self, player: PlayerId) -> Result<usize, GameError> {
        self.ensure_not_over()?;
        let index = self.index_of(player)?;
        if !matches!(self.phase, GamePhase::Setup | GamePhase::Playing) {
            return Err(GameError::WrongPhase);
        }
        if self.special_builder.unwrap_or(self.current_player) != index {
            return Err(GameError::NotYourTurn);
        }
        Ok(index)
    }

    /// The actor must be in `Main` on their own turn
    fn require_main(&self, player: PlayerId) -> Result<usize, GameError> {
        let index = self.require_active(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }
        Ok(index)
    }

    /// Any seated player may answer an offer, but only during `Main`
    fn require_trade_window(&self, player: PlayerId) -> Result<usize, GameError> {
        self.ensure_not_over()?;
        let index = self.index_of(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }
        Ok(index)
    }

    /// The actor may build: `Main` on their turn, or their special build slot
    fn require_build_turn(&self, player: PlayerId) -> Result<usize, GameError> {
        let index = self.require_active(player)?;
        if self.phase != GamePhase::Playing
            || !matches!(self.turn_phase, TurnPhase::Main | TurnPhase::SpecialBuild)
        {
            return Err(GameError::WrongPhase);
        }
        Ok(index)
    }

    // ==================== Lobby ====================

    /// Seat a new player, returning their id
    pub fn add_player(&mut self, name: impl Into<String>) -> Result<PlayerId, GameError> {
        self.ensure_not_over()?;
        if self.phase != GamePhase::Waiting {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() >= self.config.max_players() {
            return Err(GameError::GameFull);
        }
        let id = (0..=PlayerId::MAX)
            .find(|id| self.player(*id).is_none())
            .ok_or(GameError::GameFull)?;
        let name = name.into();
        debug!(player = id, %name, "player joined");
        self.players.push(Player::new(id, name));
        Ok(id)
    }

    /// Remove a player from the lobby
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), GameError> {
        self.ensure_not_over()?;
        if self.phase != GamePhase::Waiting {
            return Err(GameError::WrongPhase);
        }
        let index = self.index_of(id)?;
        self.players.remove(index);
        debug!(player = id, "player left");
        Ok(())
    }

    /// Deal a new board before the game starts
    pub fn reshuffle_board(&mut self) -> Result<(), GameError> {
        self.reshuffle_board_with_rng(&mut rand::thread_rng())
    }

    pub fn reshuffle_board_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), GameError> {
        self.ensure_not_over()?;
        if self.phase != GamePhase::Waiting {
            return Err(GameError::WrongPhase);
        }
        self.board.reshuffle(rng);
        Ok(())
    }

    /// Shuffle turn order and begin setup
    pub fn start_game(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.start_game_with_rng(&mut rand::thread_rng())
    }

    pub fn start_game_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_not_over()?;
        if self.phase != GamePhase::Waiting {
            return Err(GameError::WrongPhase);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        self.players.shuffle(rng);
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.turn_order = seat as u8 + 1;
            player.color = PlayerColor::for_seat(seat);
        }
        self.phase = GamePhase::Setup;
        self.setup_round = SetupRound::Forward;
        self.current_player = 0;

        let turn_order: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        debug!(?turn_order, "game started");
        Ok(vec![GameEvent::GameStarted { turn_order }])
    }

    // ==================== Building ====================

    /// Place a settlement: free during setup, paid afterwards
    pub fn place_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexCoord,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        if self.phase == GamePhase::Setup {
            let index = self.require_active(player)?;
            if self.setup_settlement.is_some() {
                return Err(GameError::WrongPhase);
            }
            let context = SettlementContext::Setup;
            validate_settlement(&self.board, &self.players[index], &vertex, context)?;

            self.board.place_settlement(vertex, player);
            self.players[index].build_settlement(true);
            self.setup_settlement = Some(vertex);
            events.push(GameEvent::SettlementBuilt {
                player,
                location: vertex,
            });

            if self.setup_round == SetupRound::Reverse {
                let resources = setup_bonus(&self.board, &vertex);
                self.players[index].resources.add_hand(&resources);
                if !resources.is_empty() {
                    events.push(GameEvent::SetupResourcesGranted { player, resources });
                }
            }
        } else {
            let index = self.require_build_turn(player)?;
            let context = SettlementContext::Normal;
            validate_settlement(&self.board, &self.players[index], &vertex, context)?;
            if !self.players[index].resources.can_afford(&costs::settlement()) {
                return Err(GameError::InsufficientResources);
            }

            self.board.place_settlement(vertex, player);
            self.players[index].build_settlement(false);
            events.push(GameEvent::SettlementBuilt {
                player,
                location: vertex,
            });
        }

        // A settlement can cut an opponent's road
        events.extend(self.update_longest_road());
        events.extend(self.check_victory());
        Ok(events)
    }

    /// Place a road: setup, Road Building credit, or paid
    pub fn place_road(
        &mut self,
        player: PlayerId,
        edge: EdgeCoord,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        if self.phase == GamePhase::Setup {
            let index = self.require_active(player)?;
            let settlement = self.setup_settlement.ok_or(GameError::WrongPhase)?;
            let context = RoadContext::Setup { settlement };
            validate_road(&self.board, &self.players[index], &edge, context)?;

            self.board.place_road(edge, player);
            self.players[index].build_road(true);
            self.setup_settlement = None;
            events.push(GameEvent::RoadBuilt {
                player,
                location: edge,
            });
            events.extend(self.update_longest_road());
            events.extend(self.advance_setup());
            return Ok(events);
        }

        let index = self.require_build_turn(player)?;
        let free = self.turn_phase == TurnPhase::Main && self.free_roads > 0;
        let context = if free { RoadContext::FreeRoad } else { RoadContext::Paid };
        validate_road(&self.board, &self.players[index], &edge, context)?;
        if !free && !self.players[index].resources.can_afford(&costs::road()) {
            return Err(GameError::InsufficientResources);
        }

        self.board.place_road(edge, player);
        self.players[index].build_road(free);
        if free {
            self.free_roads -= 1;
        }
        events.push(GameEvent::RoadBuilt {
            player,
            location: edge,
        });
        events.extend(self.update_longest_road());
        Ok(events)
    }

    /// Upgrade one of your settlements to a city
    pub fn build_city(
        &mut self,
        player: PlayerId,
        vertex: VertexCoord,
    ) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_build_turn(player)?;
        validate_city(&self.board, &self.players[index], &vertex)?;
        if !self.players[index].resources.can_afford(&costs::city()) {
            return Err(GameError::InsufficientResources);
        }

        self.board.upgrade_to_city(vertex, player);
        self.players[index].build_city();

        let mut events = vec![GameEvent::CityBuilt {
            player,
            location: vertex,
        }];
        events.extend(self.check_victory());
        Ok(events)
    }

    // ==================== Development Cards ====================

    /// Draw the top card of the deck
    pub fn buy_development_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_build_turn(player)?;
        if !self.players[index].can_afford_dev_card() {
            return Err(GameError::InsufficientResources);
        }
        let card = self.dev_card_deck.pop().ok_or(GameError::DeckEmpty)?;
        self.players[index].buy_dev_card(card);

        let mut events = vec![GameEvent::DevelopmentCardPurchased { player }];
        if card == DevelopmentCard::VictoryPoint {
            events.extend(self.check_victory());
        }
        Ok(events)
    }

    /// Shared checks for playing a card from hand
    fn require_card(
        &self,
        player: PlayerId,
        card: DevelopmentCard,
        before_roll: bool,
    ) -> Result<usize, GameError> {
        let index = self.require_active(player)?;
        let phase_ok = self.turn_phase == TurnPhase::Main
            || (before_roll && self.turn_phase == TurnPhase::Roll);
        if self.phase != GamePhase::Playing || self.special_builder.is_some() || !phase_ok {
            return Err(GameError::WrongPhase);
        }
        if self.dev_card_played {
            return Err(GameError::DevCardAlreadyPlayed);
        }
        if !self.players[index].has_playable_dev_card(card) {
            return Err(GameError::NoSuchCard);
        }
        Ok(index)
    }

    /// Play a knight: move the robber next, counts toward Largest Army
    pub fn play_knight(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_card(player, DevelopmentCard::Knight, true)?;
        self.players[index].play_dev_card(DevelopmentCard::Knight);
        self.dev_card_played = true;
        self.turn_phase = TurnPhase::Robber;

        let mut events = vec![GameEvent::KnightPlayed { player }];
        events.extend(self.update_largest_army());
        Ok(events)
    }

    /// Play Road Building: the next two roads are free
    pub fn play_road_building(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_card(player, DevelopmentCard::RoadBuilding, false)?;
        self.players[index].play_dev_card(DevelopmentCard::RoadBuilding);
        self.dev_card_played = true;
        self.free_roads = 2;
        Ok(vec![GameEvent::RoadBuildingPlayed { player }])
    }

    /// Play Year of Plenty: two picks from the bank follow
    pub fn play_year_of_plenty(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_card(player, DevelopmentCard::YearOfPlenty, false)?;
        self.players[index].play_dev_card(DevelopmentCard::YearOfPlenty);
        self.dev_card_played = true;
        self.free_resources = 2;
        Ok(vec![GameEvent::YearOfPlentyPlayed { player }])
    }

    /// Take one resource using a Year of Plenty pick
    pub fn pick_free_resource(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_main(player)?;
        if self.free_resources == 0 {
            return Err(GameError::WrongPhase);
        }
        self.players[index].resources.add(resource, 1);
        self.free_resources -= 1;
        Ok(vec![GameEvent::FreeResourcePicked { player, resource }])
    }

    /// Play Monopoly: every opponent hands over all of one resource
    pub fn play_monopoly(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_card(player, DevelopmentCard::Monopoly, false)?;
        self.players[index].play_dev_card(DevelopmentCard::Monopoly);
        self.dev_card_played = true;

        let mut total_taken = 0;
        for other in self.players.iter_mut().filter(|p| p.id != player) {
            total_taken += other.resources.get(resource);
            other.resources.set(resource, 0);
        }
        self.players[index].resources.add(resource, total_taken);

        Ok(vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            total_taken,
        }])
    }

    // ==================== Dice and Robber ====================

    /// Roll the dice to start the turn
    pub fn roll_dice(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.roll_dice_with_rng(player, &mut rand::thread_rng())
    }

    pub fn roll_dice_with_rng<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_active(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::Roll {
            return Err(GameError::WrongPhase);
        }

        let die1: u8 = rng.gen_range(1..=6);
        let die2: u8 = rng.gen_range(1..=6);
        let total = die1 + die2;
        self.dice_roll = Some((die1, die2));
        self.dice_rolled = true;
        debug!(player, die1, die2, total, "dice rolled");

        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: (die1, die2),
            total,
        }];
        events.extend(self.resolve_roll(total));
        Ok(events)
    }

    /// Either collect discards and move the robber, or pay out production
    fn resolve_roll(&mut self, total: u8) -> Vec<GameEvent> {
        if total == 7 {
            self.pending_discards = self
                .players
                .iter()
                .filter(|p| p.resources.total() > DISCARD_LIMIT)
                .map(|p| (p.id, p.resources.total() / 2))
                .collect();

            if self.pending_discards.is_empty() {
                self.turn_phase = TurnPhase::Robber;
                return Vec::new();
            }
            self.turn_phase = TurnPhase::Discard;
            let obligations = self.pending_discards.iter().map(|(p, n)| (*p, *n)).collect();
            return vec![GameEvent::DiscardRequired { obligations }];
        }

        let gains = distribute(&self.board, total);
        for gain in &gains {
            if let Some(player) = self.players.iter_mut().find(|p| p.id == gain.player) {
                player.resources.add(gain.resource, gain.amount);
            }
        }
        self.turn_phase = TurnPhase::Main;

        if gains.is_empty() {
            Vec::new()
        } else {
            vec![GameEvent::ResourcesDistributed { gains }]
        }
    }

    /// Discard exactly the number of cards owed after a 7
    pub fn discard_cards(
        &mut self,
        player: PlayerId,
        cards: ResourceHand,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_not_over()?;
        let index = self.index_of(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::Discard {
            return Err(GameError::WrongPhase);
        }
        let owed = *self
            .pending_discards
            .get(&player)
            .ok_or_else(|| GameError::InvalidDiscard("no discard owed".into()))?;
        if cards.total() != owed {
            return Err(GameError::InvalidDiscard(format!("must discard exactly {owed} cards")));
        }
        if !self.players[index].resources.can_afford(&cards) {
            return Err(GameError::InvalidDiscard("cannot discard cards you don't hold".into()));
        }

        self.players[index].resources.subtract(&cards);
        self.pending_discards.remove(&player);
        if self.pending_discards.is_empty() {
            self.turn_phase = TurnPhase::Robber;
        }
        Ok(vec![GameEvent::CardsDiscarded { player, count: owed }])
    }

    /// Move the robber and optionally rob a player with a building on the hex
    pub fn move_robber(
        &mut self,
        player: PlayerId,
        hex: HexCoord,
        victim: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.move_robber_with_rng(player, hex, victim, &mut rand::thread_rng())
    }

    pub fn move_robber_with_rng<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        hex: HexCoord,
        victim: Option<PlayerId>,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        let thief = self.require_active(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::Robber {
            return Err(GameError::WrongPhase);
        }
        if self.board.hex(&hex).is_none() {
            return Err(GameError::InvalidTarget(format!("hex {hex} is not on the board")));
        }
        if hex == self.board.robber() {
            return Err(GameError::InvalidTarget("the robber must move".into()));
        }
        let victim = match victim {
            Some(victim) if victim == player => {
                return Err(GameError::InvalidTarget("cannot rob yourself".into()));
            }
            Some(victim) => {
                let index = self.index_of(victim)?;
                if !self.board.players_on_hex(&hex).contains(&victim) {
                    return Err(GameError::InvalidTarget(format!(
                        "player {victim} has no building there"
                    )));
                }
                if self.players[index].resources.is_empty() {
                    return Err(GameError::InvalidTarget(format!("player {victim} has no cards")));
                }
                Some((victim, index))
            }
            None => None,
        };

        let from = self.board.robber();
        self.board.move_robber(hex);
        let mut events = vec![GameEvent::RobberMoved { player, from, to: hex }];

        if let Some((victim, index)) = victim {
            if let Some(resource) = self.players[index].resources.steal_random(rng) {
                self.players[thief].resources.add(resource, 1);
                events.push(GameEvent::ResourceStolen {
                    thief: player,
                    victim,
                    resource,
                });
            }
        }

        // A knight played before rolling returns to the roll
        self.turn_phase = if self.dice_rolled { TurnPhase::Main } else { TurnPhase::Roll };
        Ok(events)
    }

    // ==================== Trading ====================

    /// Offer a trade to one player or to everyone
    pub fn propose_trade(
        &mut self,
        player: PlayerId,
        offer: TradeOffer,
    ) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_main(player)?;
        if offer.from != player || !offer.is_valid() || offer.to == Some(player) {
            return Err(GameError::InvalidTrade);
        }
        if let Some(to) = offer.to {
            self.index_of(to)?;
        }
        if !self.players[index].resources.can_afford(&offer.offering) {
            return Err(GameError::InsufficientResources);
        }

        self.pending_trade = Some(PendingTrade {
            offer: offer.clone(),
            rejected_by: Vec::new(),
        });
        Ok(vec![GameEvent::TradeProposed { offer }])
    }

    /// Accept the open offer, swapping both sides
    pub fn accept_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let responder = self.require_trade_window(player)?;
        let offer = self
            .pending_trade
            .as_ref()
            .map(|t| t.offer.clone())
            .ok_or(GameError::NoPendingTrade)?;
        if !offer.is_addressed_to(player) {
            return Err(GameError::InvalidTrade);
        }
        let proposer = self.index_of(offer.from)?;
        if !self.players[responder].resources.can_afford(&offer.requesting)
            || !self.players[proposer].resources.can_afford(&offer.offering)
        {
            return Err(GameError::InsufficientResources);
        }

        self.players[proposer].resources.subtract(&offer.offering);
        self.players[proposer].resources.add_hand(&offer.requesting);
        self.players[responder].resources.subtract(&offer.requesting);
        self.players[responder].resources.add_hand(&offer.offering);
        self.pending_trade = None;

        Ok(vec![GameEvent::TradeCompleted {
            from: offer.from,
            accepted_by: player,
        }])
    }

    /// Turn down the open offer; it closes once every addressee has
    pub fn reject_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_trade_window(player)?;
        let others = self.players.iter().filter(|p| Some(p.id) != self.current_player_id()).count();
        let trade = self.pending_trade.as_mut().ok_or(GameError::NoPendingTrade)?;
        if !trade.offer.is_addressed_to(player) {
            return Err(GameError::InvalidTrade);
        }
        if !trade.rejected_by.contains(&player) {
            trade.rejected_by.push(player);
        }

        let mut events = vec![GameEvent::TradeRejected { player }];
        if trade.offer.to.is_some() || trade.rejected_by.len() >= others {
            self.pending_trade = None;
            events.push(GameEvent::TradeCancelled);
        }
        Ok(events)
    }

    /// Withdraw your own offer
    pub fn cancel_trade(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_trade_window(player)?;
        let trade = self.pending_trade.as_ref().ok_or(GameError::NoPendingTrade)?;
        if trade.offer.from != player {
            return Err(GameError::InvalidTrade);
        }
        self.pending_trade = None;
        Ok(vec![GameEvent::TradeCancelled])
    }

    /// Trade with the bank. `give_amount` must be a multiple of the ratio;
    /// the player receives `give_amount / ratio` of `receive`.
    pub fn bank_trade(
        &mut self,
        player: PlayerId,
        give: Resource,
        give_amount: u32,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_main(player)?;
        if give == receive {
            return Err(GameError::InvalidTrade);
        }
        let ratio = self.trade_ratio(player, give);
        if give_amount == 0 || give_amount % ratio != 0 {
            return Err(GameError::RatioMismatch {
                expected: ratio,
                offered: give_amount,
            });
        }
        if self.players[index].resources.get(give) < give_amount {
            return Err(GameError::InsufficientResources);
        }

        let received_amount = give_amount / ratio;
        let resources = &mut self.players[index].resources;
        resources.subtract(&ResourceHand::single(give, give_amount));
        resources.add(receive, received_amount);

        Ok(vec![GameEvent::BankTradeCompleted {
            player,
            gave: give,
            gave_amount: give_amount,
            received: receive,
            received_amount,
        }])
    }

    // ==================== Turn Management ====================

    /// End your turn, opening the special build rotation if it applies
    pub fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_main(player)?;

        self.players[index].end_turn();
        self.pending_trade = None;
        self.dev_card_played = false;
        self.free_roads = 0;
        self.free_resources = 0;

        let count = self.players.len();
        if self.config.uses_special_build(count) {
            let next = (index + 1) % count;
            self.special_builder = Some(next);
            self.turn_phase = TurnPhase::SpecialBuild;
            debug!(player, builder = self.players[next].id, "special build opened");
            return Ok(vec![GameEvent::SpecialBuildTurn {
                player: self.players[next].id,
            }]);
        }

        Ok(vec![self.advance_turn()])
    }

    /// Pass your special build slot to the next player
    pub fn end_special_build(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let index = self.require_active(player)?;
        if self.phase != GamePhase::Playing || self.turn_phase != TurnPhase::SpecialBuild {
            return Err(GameError::WrongPhase);
        }

        self.players[index].end_turn();
        let next = (index + 1) % self.players.len();
        if next == self.current_player {
            self.special_builder = None;
            return Ok(vec![self.advance_turn()]);
        }

        self.special_builder = Some(next);
        Ok(vec![GameEvent::SpecialBuildTurn {
            player: self.players[next].id,
        }])
    }

    /// Hand the turn to the next player in order
    fn advance_turn(&mut self) -> GameEvent {
        let player = self.players[self.current_player].id;
        self.current_player = (self.current_player + 1) % self.players.len();
        self.turn_number += 1;
        self.turn_phase = TurnPhase::Roll;
        self.dice_rolled = false;
        self.dice_roll = None;

        let next_player = self.players[self.current_player].id;
        debug!(player, next_player, turn = self.turn_number, "turn ended");
        GameEvent::TurnEnded { player, next_player }
    }

    /// Move to the next setup placement once a settlement and road are down
    fn advance_setup(&mut self) -> Vec<GameEvent> {
        let last = self.players.len() - 1;
        match self.setup_round {
            SetupRound::Forward if self.current_player < last => {
                self.current_player += 1;
            }
            SetupRound::Forward => {
                // Same player places again to open the reverse round
                self.setup_round = SetupRound::Reverse;
            }
            SetupRound::Reverse if self.current_player > 0 => {
                self.current_player -= 1;
            }
            SetupRound::Reverse => {
                self.phase = GamePhase::Playing;
                self.turn_phase = TurnPhase::Roll;
                self.turn_number = 1;
                debug!("setup complete");
                return vec![GameEvent::SetupComplete];
            }
        }
        Vec::new()
    }

    /// Declare a winner if anyone has reached the target.
    ///
    /// The acting player is checked first, then everyone else in turn order.
    pub(crate) fn check_victory(&mut self) -> Vec<GameEvent> {
        if !matches!(self.phase, GamePhase::Setup | GamePhase::Playing) || self.players.is_empty() {
            return Vec::new();
        }
        let count = self.players.len();
        let start = self.special_builder.unwrap_or(self.current_player);
        let target = self.config.victory_points_to_win;

        let winner = (0..count)
            .map(|offset| &self.players[(start + offset) % count])
            .find(|p| p.total_victory_points() >= target)
            .map(|p| (p.id, p.total_victory_points()));

        match winner {
            Some((player, victory_points)) => {
                self.phase = GamePhase::Finished;
                self.winner = Some(player);
                self.pending_trade = None;
                debug!(player, victory_points, "game won");
                vec![GameEvent::GameWon { player, victory_points }]
            }
            None => Vec::new(),
        }
    }

    // ==================== Dispatch ====================

    /// Apply an action to the game state
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.apply_action_with_rng(player, action, &mut rand::thread_rng())
    }

    pub fn apply_action_with_rng<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        action: GameAction,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::PlaceSettlement(vertex) => self.place_settlement(player, vertex),
            GameAction::PlaceRoad(edge) => self.place_road(player, edge),
            GameAction::BuildCity(vertex) => self.build_city(player, vertex),
            GameAction::RollDice => self.roll_dice_with_rng(player, rng),
            GameAction::DiscardCards(cards) => self.discard_cards(player, cards),
            GameAction::MoveRobber { hex, victim } => {
                self.move_robber_with_rng(player, hex, victim, rng)
            }
            GameAction::BuyDevelopmentCard => self.buy_development_card(player),
            GameAction::PlayKnight => self.play_knight(player),
            GameAction::PlayRoadBuilding => self.play_road_building(player),
            GameAction::PlayYearOfPlenty => self.play_year_of_plenty(player),
            GameAction::PickFreeResource(resource) => self.pick_free_resource(player, resource),
            GameAction::PlayMonopoly(resource) => self.play_monopoly(player, resource),
            GameAction::ProposeTrade(offer) => self.propose_trade(player, offer),
            GameAction::AcceptTrade => self.accept_trade(player),
            GameAction::RejectTrade => self.reject_trade(player),
            GameAction::CancelTrade => self.cancel_trade(player),
            GameAction::BankTrade {
                give,
                give_amount,
                receive,
            } => self.bank_trade(player, give, give_amount, receive),
            GameAction::EndTurn => self.end_turn(player),
            GameAction::EndSpecialBuild => self.end_special_build(player),
        }
    }
}
