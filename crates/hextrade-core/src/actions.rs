//! Game actions that players can take.
//!
//! This module defines every request a player can make during a game and
//! the public events those requests produce. Events carry the facts every
//! participant may see: dice, gains, thefts, placements and title changes.

use crate::board::{PlayerId, Resource};
use crate::distribution::ResourceGain;
use crate::hex::{EdgeCoord, HexCoord, VertexCoord};
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};

/// All possible in-game actions, dispatched by `GameState::apply_action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GameAction {
    // ==================== Building ====================
    /// Place a settlement (setup or paid)
    PlaceSettlement(VertexCoord),
    /// Place a road (setup, free or paid)
    PlaceRoad(EdgeCoord),
    /// Upgrade a settlement to a city
    BuildCity(VertexCoord),

    // ==================== Turn Actions ====================
    /// Roll the dice (must be done at start of turn)
    RollDice,
    /// Discard cards owed after a 7
    DiscardCards(ResourceHand),
    /// Move the robber, optionally stealing from a player on the target hex
    MoveRobber {
        hex: HexCoord,
        victim: Option<PlayerId>,
    },

    // ==================== Development Cards ====================
    BuyDevelopmentCard,
    PlayKnight,
    /// Grants two free roads
    PlayRoadBuilding,
    /// Grants two free resource picks
    PlayYearOfPlenty,
    /// Take one resource from the bank using a Year of Plenty pick
    PickFreeResource(Resource),
    PlayMonopoly(Resource),

    // ==================== Trading ====================
    ProposeTrade(TradeOffer),
    AcceptTrade,
    RejectTrade,
    CancelTrade,
    /// Trade with the bank at the best ratio the player's ports allow
    BankTrade {
        give: Resource,
        give_amount: u32,
        receive: Resource,
    },

    // ==================== Turn Management ====================
    EndTurn,
    /// Pass your slot in the special building rotation
    EndSpecialBuild,
}

/// A trade offer between players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player making the offer
    pub from: PlayerId,
    /// Specific player to trade with, or None for open offer
    pub to: Option<PlayerId>,
    /// Resources being offered
    pub offering: ResourceHand,
    /// Resources being requested
    pub requesting: ResourceHand,
}

impl TradeOffer {
    /// Create a new trade offer
    pub fn new(
        from: PlayerId,
        to: Option<PlayerId>,
        offering: ResourceHand,
        requesting: ResourceHand,
    ) -> Self {
        Self {
            from,
            to,
            offering,
            requesting,
        }
    }

    /// Check if offer is valid (non-empty on both sides, no resource on both)
    pub fn is_valid(&self) -> bool {
        !self.offering.is_empty()
            && !self.requesting.is_empty()
            && Resource::ALL
                .iter()
                .all(|&r| self.offering.get(r) == 0 || self.requesting.get(r) == 0)
    }

    /// Whether `player` may answer this offer
    pub fn is_addressed_to(&self, player: PlayerId) -> bool {
        player != self.from && self.to.map_or(true, |to| to == player)
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ==================== Lobby ====================
    PlayerJoined {
        player: PlayerId,
        name: String,
    },
    PlayerLeft {
        player: PlayerId,
    },
    BoardReshuffled,
    /// Setup began; players listed in turn order
    GameStarted {
        turn_order: Vec<PlayerId>,
    },

    // ==================== Setup ====================
    /// Second setup settlement paid out its neighbouring hexes
    SetupResourcesGranted {
        player: PlayerId,
        resources: ResourceHand,
    },
    /// Setup is over and regular turns begin
    SetupComplete,

    // ==================== Building ====================
    SettlementBuilt {
        player: PlayerId,
        location: VertexCoord,
    },
    CityBuilt {
        player: PlayerId,
        location: VertexCoord,
    },
    RoadBuilt {
        player: PlayerId,
        location: EdgeCoord,
    },

    // ==================== Dice and Robber ====================
    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },
    ResourcesDistributed {
        gains: Vec<ResourceGain>,
    },
    /// Players holding more than 7 cards, with the number each owes
    DiscardRequired {
        obligations: Vec<(PlayerId, u32)>,
    },
    CardsDiscarded {
        player: PlayerId,
        count: u32,
    },
    RobberMoved {
        player: PlayerId,
        from: HexCoord,
        to: HexCoord,
    },
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },

    // ==================== Development Cards ====================
    DevelopmentCardPurchased {
        player: PlayerId,
    },
    KnightPlayed {
        player: PlayerId,
    },
    RoadBuildingPlayed {
        player: PlayerId,
    },
    YearOfPlentyPlayed {
        player: PlayerId,
    },
    FreeResourcePicked {
        player: PlayerId,
        resource: Resource,
    },
    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_taken: u32,
    },

    // ==================== Trading ====================
    TradeProposed {
        offer: TradeOffer,
    },
    TradeCompleted {
        from: PlayerId,
        accepted_by: PlayerId,
    },
    TradeRejected {
        player: PlayerId,
    },
    TradeCancelled,
    BankTradeCompleted {
        player: PlayerId,
        gave: Resource,
        gave_amount: u32,
        received: Resource,
        received_amount: u32,
    },

    // ==================== Titles ====================
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    // ==================== Turn Flow ====================
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },
    /// A player's slot in the special building rotation opened
    SpecialBuildTurn {
        player: PlayerId,
    },
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}
