//! Game board representation including tiles, buildings, and ports.
//!
//! This module contains:
//! - Resource and terrain types
//! - The fixed layouts for the standard and extended boards
//! - Board generation (terrain and number-token shuffling)
//! - Building slots on every vertex and edge, and the queries over them
//!
//! Every vertex and edge touching a land hex gets an empty slot at generation
//! time. Slots are keyed by [`VertexCoord`]/[`EdgeCoord`], whose equality is
//! spelling-independent, so a lookup under any equivalent spelling finds the
//! same slot.

use crate::config::BoardSize;
use crate::hex::{EdgeCoord, HexCoord, VertexCoord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Player identifier, assigned when a player joins
pub type PlayerId = u8;

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Brick,
    Lumber,
    Ore,
    Grain,
    Wool,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Lumber,
        Resource::Ore,
        Resource::Grain,
        Resource::Wool,
    ];
}

/// Terrain of a land hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Forest,
    Pasture,
    Fields,
    Hills,
    Mountains,
    /// Produces nothing and never carries a number token
    Desert,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(self) -> Option<Resource> {
        match self {
            Terrain::Forest => Some(Resource::Lumber),
            Terrain::Pasture => Some(Resource::Wool),
            Terrain::Fields => Some(Resource::Grain),
            Terrain::Hills => Some(Resource::Brick),
            Terrain::Mountains => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }
}

/// Port trade classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// The exchange rate for this port
    pub fn rate(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specific(_) => 2,
        }
    }
}

/// A port: two coastal vertices sharing a trade class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub vertices: [VertexCoord; 2],
    pub kind: PortKind,
}

/// A single land hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Position on the hex grid
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (2-12, None for the desert)
    pub token: Option<u8>,
}

impl Tile {
    /// Get the resource this tile produces, if any
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }
}

/// What's built on a vertex (corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "owner", rename_all = "snake_case")]
pub enum VertexBuilding {
    /// Nothing built
    #[default]
    Empty,
    /// Settlement (1 VP, 1 resource per adjacent tile)
    Settlement(PlayerId),
    /// City (2 VP, 2 resources per adjacent tile)
    City(PlayerId),
}

impl VertexBuilding {
    /// Get the owner of this building, if any
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            VertexBuilding::Empty => None,
            VertexBuilding::Settlement(p) | VertexBuilding::City(p) => Some(*p),
        }
    }

    /// Victory points provided by this building
    pub fn victory_points(&self) -> u32 {
        match self {
            VertexBuilding::Empty => 0,
            VertexBuilding::Settlement(_) => 1,
            VertexBuilding::City(_) => 2,
        }
    }

    /// Resource multiplier (how many resources per production)
    pub fn resource_multiplier(&self) -> u32 {
        self.victory_points()
    }
}

/// What's built on an edge (side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "owner", rename_all = "snake_case")]
pub enum EdgeBuilding {
    /// Nothing built
    #[default]
    Empty,
    /// Road
    Road(PlayerId),
}

impl EdgeBuilding {
    /// Get the owner of this road, if any
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            EdgeBuilding::Empty => None,
            EdgeBuilding::Road(p) => Some(*p),
        }
    }
}

/// Rows of the standard layout as `(r, q_min, q_max)`
const STANDARD_ROWS: [(i32, i32, i32); 5] =
    [(-2, 0, 2), (-1, -1, 2), (0, -2, 2), (1, -2, 1), (2, -2, 0)];

/// Rows of the extended layout as `(r, q_min, q_max)`
const EXTENDED_ROWS: [(i32, i32, i32); 7] = [
    (-3, 0, 2),
    (-2, -1, 2),
    (-1, -2, 2),
    (0, -3, 2),
    (1, -3, 1),
    (2, -3, 0),
    (3, -3, -1),
];

/// `(q, r, dir)` of both port vertices, plus the trade class
type PortLayout = ([i32; 3], [i32; 3], PortKind);

const STANDARD_PORTS: [PortLayout; 9] = [
    ([-2, 0, 4], [-2, 0, 5], PortKind::Generic),
    ([-1, -1, 5], [-1, -1, 0], PortKind::Specific(Resource::Grain)),
    ([0, -2, 0], [0, -2, 1], PortKind::Specific(Resource::Ore)),
    ([2, -2, 0], [2, -2, 1], PortKind::Generic),
    ([2, -1, 1], [2, -1, 2], PortKind::Specific(Resource::Wool)),
    ([2, 0, 2], [2, 0, 3], PortKind::Generic),
    ([0, 2, 2], [0, 2, 3], PortKind::Generic),
    ([-1, 2, 3], [-1, 2, 4], PortKind::Specific(Resource::Brick)),
    ([-2, 2, 4], [-2, 2, 5], PortKind::Specific(Resource::Lumber)),
];

const EXTENDED_PORTS: [PortLayout; 11] = [
    ([-3, 0, 4], [-3, 0, 5], PortKind::Generic),
    ([-2, -1, 5], [-2, -1, 0], PortKind::Specific(Resource::Grain)),
    ([0, -3, 4], [0, -3, 5], PortKind::Specific(Resource::Ore)),
    ([1, -3, 0], [1, -3, 1], PortKind::Generic),
    ([2, -3, 1], [2, -3, 2], PortKind::Specific(Resource::Wool)),
    ([2, -1, 1], [2, -1, 2], PortKind::Generic),
    ([2, 0, 2], [2, 0, 3], PortKind::Specific(Resource::Wool)),
    ([0, 2, 2], [0, 2, 3], PortKind::Generic),
    ([-1, 3, 3], [-1, 3, 4], PortKind::Specific(Resource::Brick)),
    ([-3, 3, 3], [-3, 3, 4], PortKind::Generic),
    ([-3, 2, 4], [-3, 2, 5], PortKind::Specific(Resource::Lumber)),
];

impl BoardSize {
    /// Land hex positions in the fixed assignment order
    pub fn positions(self) -> Vec<HexCoord> {
        let rows: &[(i32, i32, i32)] = match self {
            BoardSize::Standard => &STANDARD_ROWS,
            BoardSize::Extended => &EXTENDED_ROWS,
        };
        rows.iter()
            .flat_map(|&(r, q_min, q_max)| (q_min..=q_max).map(move |q| HexCoord::new(q, r)))
            .collect()
    }

    /// Terrain multiset, one entry per land hex
    pub fn terrains(self) -> Vec<Terrain> {
        // forest, pasture, fields, hills, mountains, desert
        let counts: [(Terrain, usize); 6] = match self {
            BoardSize::Standard => [
                (Terrain::Forest, 4),
                (Terrain::Pasture, 4),
                (Terrain::Fields, 4),
                (Terrain::Hills, 3),
                (Terrain::Mountains, 3),
                (Terrain::Desert, 1),
            ],
            BoardSize::Extended => [
                (Terrain::Forest, 6),
                (Terrain::Pasture, 6),
                (Terrain::Fields, 6),
                (Terrain::Hills, 5),
                (Terrain::Mountains, 5),
                (Terrain::Desert, 2),
            ],
        };
        counts
            .iter()
            .flat_map(|&(terrain, n)| std::iter::repeat(terrain).take(n))
            .collect()
    }

    /// Number-token multiset, one entry per non-desert hex
    pub fn tokens(self) -> Vec<u8> {
        match self {
            BoardSize::Standard => vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12],
            BoardSize::Extended => vec![
                2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 5, 6, 6, 6, 8, 8, 8, 9, 9, 9, 10, 10, 10, 11, 11, 11,
                12, 12,
            ],
        }
    }

    /// The fixed port layout
    pub fn ports(self) -> Vec<Port> {
        let layouts: &[PortLayout] = match self {
            BoardSize::Standard => &STANDARD_PORTS,
            BoardSize::Extended => &EXTENDED_PORTS,
        };
        layouts
            .iter()
            .filter_map(|&(a, b, kind)| {
                let a = VertexCoord::from_parts(a[0], a[1], a[2] as u8)?;
                let b = VertexCoord::from_parts(b[0], b[1], b[2] as u8)?;
                Some(Port {
                    vertices: [a, b],
                    kind,
                })
            })
            .collect()
    }
}

/// The complete game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    size: BoardSize,
    /// All land tiles indexed by coordinate
    #[serde(with = "entries")]
    tiles: BTreeMap<HexCoord, Tile>,
    /// Building slots on vertices
    #[serde(with = "entries")]
    vertices: BTreeMap<VertexCoord, VertexBuilding>,
    /// Road slots on edges
    #[serde(with = "entries")]
    edges: BTreeMap<EdgeCoord, EdgeBuilding>,
    ports: Vec<Port>,
    /// Current robber location
    robber: HexCoord,
}

impl Board {
    /// Create the standard board layout with randomized tiles and numbers
    pub fn standard() -> Self {
        Self::generate(BoardSize::Standard, &mut rand::thread_rng())
    }

    /// Generate a board of the given size with a provided RNG
    pub fn generate<R: Rng + ?Sized>(size: BoardSize, rng: &mut R) -> Self {
        let mut board = Self {
            size,
            tiles: BTreeMap::new(),
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            ports: size.ports(),
            robber: HexCoord::default(),
        };
        board.shuffle_tiles(rng);
        board.allocate_slots();
        board
    }

    /// Re-deal terrain and numbers, clearing every building.
    ///
    /// Only meaningful before play starts; the game guards that.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Self::generate(self.size, rng);
    }

    /// Shuffle terrain and tokens independently and deal them in position order
    fn shuffle_tiles<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let positions = self.size.positions();
        let mut terrains = self.size.terrains();
        let mut tokens = self.size.tokens();
        terrains.shuffle(rng);
        tokens.shuffle(rng);

        let mut tokens = tokens.into_iter();
        let mut robber = None;
        self.tiles.clear();

        for (coord, terrain) in positions.into_iter().zip(terrains) {
            let token = if terrain == Terrain::Desert {
                robber.get_or_insert(coord);
                None
            } else {
                tokens.next()
            };
            self.tiles.insert(coord, Tile { coord, terrain, token });
        }

        self.robber = robber.unwrap_or_default();
    }

    /// Create an empty slot for every vertex and edge of every land hex
    fn allocate_slots(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        for coord in self.tiles.keys() {
            for vertex in coord.vertices() {
                self.vertices.entry(vertex.canonical()).or_default();
            }
            for edge in coord.edges() {
                self.edges.entry(edge.canonical()).or_default();
            }
        }
    }

    // ==================== Query Methods ====================

    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Get a tile by coordinate
    pub fn hex(&self, coord: &HexCoord) -> Option<&Tile> {
        self.tiles.get(coord)
    }

    /// All land tiles in coordinate order
    pub fn hexes(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Whether a vertex touches at least one land hex
    pub fn contains_vertex(&self, vertex: &VertexCoord) -> bool {
        self.vertices.contains_key(vertex)
    }

    /// Whether an edge touches at least one land hex
    pub fn contains_edge(&self, edge: &EdgeCoord) -> bool {
        self.edges.contains_key(edge)
    }

    /// Get building at a vertex (any spelling)
    pub fn building_at(&self, vertex: &VertexCoord) -> VertexBuilding {
        self.vertices.get(vertex).copied().unwrap_or_default()
    }

    /// Get road at an edge (any spelling)
    pub fn road_at(&self, edge: &EdgeCoord) -> EdgeBuilding {
        self.edges.get(edge).copied().unwrap_or_default()
    }

    /// Every vertex slot, canonical spelling first
    pub fn vertices(&self) -> impl Iterator<Item = (&VertexCoord, &VertexBuilding)> {
        self.vertices.iter()
    }

    /// Every edge slot, canonical spelling first
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeCoord, &EdgeBuilding)> {
        self.edges.iter()
    }

    /// Get the robber's current location
    pub fn robber(&self) -> HexCoord {
        self.robber
    }

    /// Land tiles meeting at a vertex (up to 3)
    pub fn hexes_at_vertex(&self, vertex: &VertexCoord) -> Vec<&Tile> {
        vertex
            .touching_hexes()
            .iter()
            .filter_map(|h| self.tiles.get(h))
            .collect()
    }

    /// Edges owned by a player
    pub fn roads_of(&self, player: PlayerId) -> Vec<EdgeCoord> {
        self.edges
            .iter()
            .filter(|(_, road)| road.owner() == Some(player))
            .map(|(edge, _)| *edge)
            .collect()
    }

    /// Whether the player has a road on any edge meeting at `vertex`
    pub fn has_road_at_vertex(&self, vertex: &VertexCoord, player: PlayerId) -> bool {
        vertex
            .touching_edges()
            .iter()
            .any(|edge| self.road_at(edge).owner() == Some(player))
    }

    /// Players with a building on a corner of `hex`, ascending
    pub fn players_on_hex(&self, hex: &HexCoord) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = hex
            .vertices()
            .iter()
            .filter_map(|v| self.building_at(v).owner())
            .collect();
        players.sort_unstable();
        players.dedup();
        players
    }

    /// Ports a player can use through their buildings
    pub fn player_ports(&self, player: PlayerId) -> Vec<PortKind> {
        self.ports
            .iter()
            .filter(|port| {
                port.vertices
                    .iter()
                    .any(|v| self.building_at(v).owner() == Some(player))
            })
            .map(|port| port.kind)
            .collect()
    }

    // ==================== Mutation Methods ====================
    //
    // These assume the placement validator has already accepted the move.

    pub fn place_settlement(&mut self, vertex: VertexCoord, player: PlayerId) {
        self.vertices.insert(vertex.canonical(), VertexBuilding::Settlement(player));
    }

    pub fn upgrade_to_city(&mut self, vertex: VertexCoord, player: PlayerId) {
        self.vertices.insert(vertex.canonical(), VertexBuilding::City(player));
    }

    pub fn place_road(&mut self, edge: EdgeCoord, player: PlayerId) {
        self.edges.insert(edge.canonical(), EdgeBuilding::Road(player));
    }

    pub fn move_robber(&mut self, hex: HexCoord) {
        self.robber = hex;
    }
}

/// Serialize a map as a list of `[key, value]` pairs so non-string keys survive JSON
mod entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
