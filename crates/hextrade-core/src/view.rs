//! Per-player projection of the game state.
//!
//! Opponents' hands and development cards collapse to counts, and their
//! hidden victory points stay secret. Once the game is over every player
//! is shown in full.

use crate::achievements::Achievement;
use crate::board::{Board, PlayerId, PortKind, Resource};
use crate::config::GameConfig;
use crate::game::{GamePhase, GameState, PendingTrade, SetupRound, TurnPhase};
use crate::hex::VertexCoord;
use crate::player::{DevelopmentCard, Player, PlayerColor, ResourceHand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A player's resource cards as seen by the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum HandView {
    Visible(ResourceHand),
    Hidden { total: u32 },
}

/// A player's development cards as seen by the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum DevCardsView {
    Visible {
        playable: Vec<DevelopmentCard>,
        bought_this_turn: Vec<DevelopmentCard>,
    },
    Hidden { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub turn_order: u8,
    pub hand: HandView,
    pub dev_cards: DevCardsView,
    pub played_knights: u32,
    /// Public points: buildings and titles
    pub victory_points: u32,
    /// Zero for opponents until the game ends
    pub hidden_victory_points: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    pub longest_road: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
}

impl PlayerSummary {
    fn project(player: &Player, reveal: bool) -> Self {
        let hand = if reveal {
            HandView::Visible(player.resources)
        } else {
            HandView::Hidden {
                total: player.resources.total(),
            }
        };
        let dev_cards = if reveal {
            DevCardsView::Visible {
                playable: player.dev_cards.clone(),
                bought_this_turn: player.dev_cards_bought_this_turn.clone(),
            }
        } else {
            DevCardsView::Hidden {
                count: player.dev_card_count(),
            }
        };

        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color,
            turn_order: player.turn_order,
            hand,
            dev_cards,
            played_knights: player.played_knights,
            victory_points: player.victory_points,
            hidden_victory_points: if reveal {
                player.hidden_victory_points
            } else {
                0
            },
            has_longest_road: player.has_longest_road,
            has_largest_army: player.has_largest_army,
            longest_road: player.longest_road,
            settlements_remaining: player.settlements_remaining,
            cities_remaining: player.cities_remaining,
            roads_remaining: player.roads_remaining,
        }
    }
}

/// Everything one player is allowed to see
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub viewer: PlayerId,
    pub config: GameConfig,
    pub board: Board,
    pub players: Vec<PlayerSummary>,
    pub phase: GamePhase,
    pub turn_phase: TurnPhase,
    pub setup_round: SetupRound,
    pub current_player: Option<PlayerId>,
    pub special_builder: Option<PlayerId>,
    pub setup_settlement: Option<VertexCoord>,
    pub pending_trade: Option<PendingTrade>,
    pub pending_discards: BTreeMap<PlayerId, u32>,
    pub turn_number: u32,
    pub dice_roll: Option<(u8, u8)>,
    pub dice_rolled: bool,
    pub dev_card_played: bool,
    pub free_roads: u8,
    pub free_resources: u8,
    pub longest_road: Achievement,
    pub largest_army: Achievement,
    pub winner: Option<PlayerId>,
    pub deck_remaining: usize,
    /// Port kinds the viewer can use
    pub my_ports: Vec<PortKind>,
    /// Viewer's bank ratio per resource
    pub trade_ratios: BTreeMap<Resource, u32>,
}

impl PlayerView {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The viewer's own summary
    pub fn me(&self) -> Option<&PlayerSummary> {
        self.players.iter().find(|p| p.id == self.viewer)
    }
}

impl GameState {
    /// Project the state for one player. An unknown id sees every hand hidden
    /// until the game is finished.
    pub fn view_for(&self, viewer: PlayerId) -> PlayerView {
        let game_over = self.phase == GamePhase::Finished;
        let players = self
            .players
            .iter()
            .map(|p| PlayerSummary::project(p, p.id == viewer || game_over))
            .collect();
        let seated = self.player(viewer).is_some();

        PlayerView {
            viewer,
            config: self.config.clone(),
            board: self.board.clone(),
            players,
            phase: self.phase,
            turn_phase: self.turn_phase,
            setup_round: self.setup_round,
            current_player: self.current_player_id(),
            special_builder: self
                .special_builder
                .and_then(|i| self.players.get(i))
                .map(|p| p.id),
            setup_settlement: self.setup_settlement,
            pending_trade: self.pending_trade.clone(),
            pending_discards: self.pending_discards.clone(),
            turn_number: self.turn_number,
            dice_roll: self.dice_roll,
            dice_rolled: self.dice_rolled,
            dev_card_played: self.dev_card_played,
            free_roads: self.free_roads,
            free_resources: self.free_resources,
            longest_road: self.longest_road,
            largest_army: self.largest_army,
            winner: self.winner,
            deck_remaining: self.deck_remaining(),
            my_ports: if seated {
                self.board.player_ports(viewer)
            } else {
                Vec::new()
            },
            trade_ratios: if seated {
                self.trade_ratios(viewer)
            } else {
                BTreeMap::new()
            },
        }
    }
}
