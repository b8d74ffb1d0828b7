//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, development cards, inventory and achievements
//! - ResourceHand for managing resource counts
//! - Development card types and the two deck compositions
//! - Building costs

use crate::board::{PlayerId, Resource};
use crate::config::BoardSize;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Player color for UI rendering, assigned by turn order at game start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
    Green,
    Brown,
}

impl PlayerColor {
    /// Get color for a seat in turn order
    pub fn for_seat(seat: usize) -> Self {
        match seat % 6 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Orange,
            3 => PlayerColor::White,
            4 => PlayerColor::Green,
            _ => PlayerColor::Brown,
        }
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Worth 1 hidden VP from the moment it is bought
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All players must give you all of one resource type
    Monopoly,
}

impl DevelopmentCard {
    fn deck(knights: usize, points: usize, others: usize) -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(knights + points + 3 * others);
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(knights));
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(points));
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(others));
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(others));
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(others));
        deck
    }

    /// Create the standard development card deck (25 cards)
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        Self::deck(14, 5, 2)
    }

    /// Create the extended development card deck (34 cards)
    pub fn extended_deck() -> Vec<DevelopmentCard> {
        Self::deck(20, 5, 3)
    }

    /// Build and shuffle the deck matching a board size
    pub fn shuffled_deck<R: Rng + ?Sized>(size: BoardSize, rng: &mut R) -> Vec<DevelopmentCard> {
        let mut deck = match size {
            BoardSize::Standard => Self::standard_deck(),
            BoardSize::Extended => Self::extended_deck(),
        };
        deck.shuffle(rng);
        deck
    }

    /// Whether this card can be played (VP cards are never "played")
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevelopmentCard::VictoryPoint)
    }
}

/// A hand of resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub brick: u32,
    pub lumber: u32,
    pub ore: u32,
    pub grain: u32,
    pub wool: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(brick: u32, lumber: u32, ore: u32, grain: u32, wool: u32) -> Self {
        Self {
            brick,
            lumber,
            ore,
            grain,
            wool,
        }
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.brick + self.lumber + self.ore + self.grain + self.wool
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Brick => self.brick,
            Resource::Lumber => self.lumber,
            Resource::Ore => self.ore,
            Resource::Grain => self.grain,
            Resource::Wool => self.wool,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::Brick => self.brick = count,
            Resource::Lumber => self.lumber = count,
            Resource::Ore => self.ore = count,
            Resource::Grain => self.grain = count,
            Resource::Wool => self.wool = count,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        let current = self.get(resource);
        self.set(resource, current + amount);
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for (resource, amount) in other.iter() {
            self.add(resource, amount);
        }
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .all(|&r| self.get(r) >= cost.get(r))
    }

    /// Subtract a cost. Callers check [`ResourceHand::can_afford`] first;
    /// counters saturate at zero rather than wrap.
    pub fn subtract(&mut self, cost: &ResourceHand) {
        debug_assert!(self.can_afford(cost), "Cannot afford this cost");
        for resource in Resource::ALL {
            let current = self.get(resource);
            self.set(resource, current.saturating_sub(cost.get(resource)));
        }
    }

    /// Remove one card of a resource type picked uniformly among the types held
    pub fn steal_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Resource> {
        let held: Vec<Resource> = Resource::ALL
            .into_iter()
            .filter(|&r| self.get(r) > 0)
            .collect();
        let resource = *held.choose(rng)?;
        self.subtract(&ResourceHand::single(resource, 1));
        Some(resource)
    }

    /// Non-zero counts in resource order
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(move |r| (r, self.get(r)))
            .filter(|(_, n)| *n > 0)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 brick, 1 lumber
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Cost to build a settlement: 1 brick, 1 lumber, 1 grain, 1 wool
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 1, 1)
    }

    /// Cost to upgrade to city: 3 ore, 2 grain
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 3, 2, 0)
    }

    /// Cost to buy a development card: 1 ore, 1 grain, 1 wool
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// Pieces each player starts with
pub const STARTING_SETTLEMENTS: u32 = 5;
pub const STARTING_CITIES: u32 = 4;
pub const STARTING_ROADS: u32 = 15;

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Display name
    pub name: String,
    pub color: PlayerColor,
    /// 1-based position in turn order, 0 until the game starts
    pub turn_order: u8,
    /// Current resources
    pub resources: ResourceHand,
    /// Development cards in hand (playable)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Development cards bought this turn (can't be played same turn)
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub played_knights: u32,
    /// Points from buildings and titles, visible to everyone
    pub victory_points: u32,
    /// Points from victory point cards, revealed when the game ends
    pub hidden_victory_points: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    /// Cached longest road length
    pub longest_road: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_seat(id as usize),
            turn_order: 0,
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            played_knights: 0,
            victory_points: 0,
            hidden_victory_points: 0,
            has_longest_road: false,
            has_largest_army: false,
            longest_road: 0,
            settlements_remaining: STARTING_SETTLEMENTS,
            cities_remaining: STARTING_CITIES,
            roads_remaining: STARTING_ROADS,
        }
    }

    /// Visible plus hidden points
    pub fn total_victory_points(&self) -> u32 {
        self.victory_points + self.hidden_victory_points
    }

    /// Number of development cards held, including ones bought this turn
    pub fn dev_card_count(&self) -> usize {
        self.dev_cards.len() + self.dev_cards_bought_this_turn.len()
    }

    /// Can this player afford a development card?
    pub fn can_afford_dev_card(&self) -> bool {
        self.resources.can_afford(&costs::development_card())
    }

    /// Take a settlement piece, paying for it unless `free`
    pub fn build_settlement(&mut self, free: bool) {
        if !free {
            self.resources.subtract(&costs::settlement());
        }
        self.settlements_remaining -= 1;
        self.victory_points += 1;
    }

    /// Take a road piece, paying for it unless `free`
    pub fn build_road(&mut self, free: bool) {
        if !free {
            self.resources.subtract(&costs::road());
        }
        self.roads_remaining -= 1;
    }

    /// Buy a city (returns the settlement piece)
    pub fn build_city(&mut self) {
        self.resources.subtract(&costs::city());
        self.cities_remaining -= 1;
        self.settlements_remaining += 1;
        self.victory_points += 1;
    }

    /// Buy a development card
    pub fn buy_dev_card(&mut self, card: DevelopmentCard) {
        self.resources.subtract(&costs::development_card());
        if card == DevelopmentCard::VictoryPoint {
            self.hidden_victory_points += 1;
        }
        self.dev_cards_bought_this_turn.push(card);
    }

    /// Called at end of turn - move bought cards to playable pile
    pub fn end_turn(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
    }

    /// Check if player has a playable development card of given type
    pub fn has_playable_dev_card(&self, card_type: DevelopmentCard) -> bool {
        card_type.is_playable() && self.dev_cards.contains(&card_type)
    }

    /// Play a development card (removes it from hand)
    pub fn play_dev_card(&mut self, card_type: DevelopmentCard) -> bool {
        if !card_type.is_playable() {
            return false;
        }
        if let Some(pos) = self.dev_cards.iter().position(|c| *c == card_type) {
            self.dev_cards.remove(pos);
            if card_type == DevelopmentCard::Knight {
                self.played_knights += 1;
            }
            true
        } else {
            false
        }
    }
}
