//! Hex coordinate system using axial coordinates (q, r).
//!
//! This module provides the foundational coordinate types for the hex-based game board:
//! - `HexCoord`: Identifies individual hex tiles
//! - `VertexCoord`: Identifies corners where settlements/cities are placed
//! - `EdgeCoord`: Identifies sides where roads are placed
//!
//! A vertex is written as a hex plus one of its six corners, and an edge as a hex
//! plus one of its six sides. The same physical corner is reachable from the three
//! hexes that meet there, and the same side from the two hexes it separates. Every
//! such spelling is an *equivalent* representation; `equivalents()` enumerates them
//! and equality, ordering and hashing are all defined on the canonical (smallest)
//! one, so any map keyed by these types answers the same for every spelling.
//!
//! The board is pointy-top: corner 0 is the north tip and corners run clockwise,
//! side 0 is the north-east side (between corners 0 and 1) and sides run clockwise.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Side length used for the geometric adjacency checks.
pub const UNIT_HEX_SIZE: f64 = 1.0;

/// Tolerance when comparing projected pixel positions.
const GEOMETRY_EPSILON: f64 = 1e-6;

/// Direction of a vertex relative to a hex, clockwise from the north tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VertexDirection {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl VertexDirection {
    /// All corners in clockwise order starting from North
    pub const ALL: [VertexDirection; 6] = [
        VertexDirection::North,
        VertexDirection::NorthEast,
        VertexDirection::SouthEast,
        VertexDirection::South,
        VertexDirection::SouthWest,
        VertexDirection::NorthWest,
    ];

    /// Local direction index (0-5)
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Look up a corner by local direction index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Rotate clockwise by `steps` corners
    pub fn rotate(self, steps: u8) -> Self {
        Self::ALL[((self.index() + steps) % 6) as usize]
    }

    /// The side that starts at this corner (running clockwise)
    fn side_after(self) -> EdgeDirection {
        EdgeDirection::ALL[self.index() as usize]
    }

    /// The side that ends at this corner
    fn side_before(self) -> EdgeDirection {
        self.side_after().rotate(5)
    }

    /// Angle of this corner from the hex centre, in degrees (screen space, y down)
    fn angle_degrees(self) -> f64 {
        -90.0 + 60.0 * self.index() as f64
    }
}

impl TryFrom<u8> for VertexDirection {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or_else(|| format!("vertex direction {value} out of range 0-5"))
    }
}

impl From<VertexDirection> for u8 {
    fn from(direction: VertexDirection) -> Self {
        direction.index()
    }
}

/// Direction of an edge relative to a hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EdgeDirection {
    /// Northeast edge (top-right)
    NorthEast,
    /// East edge (right)
    East,
    /// Southeast edge (bottom-right)
    SouthEast,
    /// Southwest edge (bottom-left)
    SouthWest,
    /// West edge (left)
    West,
    /// Northwest edge (top-left)
    NorthWest,
}

impl EdgeDirection {
    /// All edge directions in clockwise order starting from NorthEast
    pub const ALL: [EdgeDirection; 6] = [
        EdgeDirection::NorthEast,
        EdgeDirection::East,
        EdgeDirection::SouthEast,
        EdgeDirection::SouthWest,
        EdgeDirection::West,
        EdgeDirection::NorthWest,
    ];

    /// Local direction index (0-5)
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Look up a side by local direction index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Rotate clockwise by `steps` sides
    pub fn rotate(self, steps: u8) -> Self {
        Self::ALL[((self.index() + steps) % 6) as usize]
    }

    /// The side facing this one on the neighbouring hex
    pub fn opposite(self) -> Self {
        self.rotate(3)
    }

    /// The corners at either end of this side, clockwise
    fn corners(self) -> [VertexDirection; 2] {
        let start = VertexDirection::ALL[self.index() as usize];
        [start, start.rotate(1)]
    }

    /// Axial offset to the neighbouring hex across this side
    const fn offset(self) -> (i32, i32) {
        match self {
            EdgeDirection::NorthEast => (1, -1),
            EdgeDirection::East => (1, 0),
            EdgeDirection::SouthEast => (0, 1),
            EdgeDirection::SouthWest => (-1, 1),
            EdgeDirection::West => (-1, 0),
            EdgeDirection::NorthWest => (0, -1),
        }
    }
}

impl TryFrom<u8> for EdgeDirection {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or_else(|| format!("edge direction {value} out of range 0-5"))
    }
}

impl From<EdgeDirection> for u8 {
    fn from(direction: EdgeDirection) -> Self {
        direction.index()
    }
}

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in clockwise order starting from NorthEast
    pub fn neighbors(&self) -> [HexCoord; 6] {
        EdgeDirection::ALL.map(|dir| self.neighbor(dir))
    }

    /// Get the neighbor in a specific direction
    pub fn neighbor(&self, direction: EdgeDirection) -> HexCoord {
        let (dq, dr) = direction.offset();
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// The six corners of this hex, as seen from this hex
    pub fn vertices(&self) -> [VertexCoord; 6] {
        VertexDirection::ALL.map(|dir| VertexCoord::new(*self, dir))
    }

    /// The six sides of this hex, as seen from this hex
    pub fn edges(&self) -> [EdgeCoord; 6] {
        EdgeDirection::ALL.map(|dir| EdgeCoord::new(*self, dir))
    }

    /// Convert to pixel coordinates (center of hex)
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Vertex coordinate - a hex corner, shared by up to three hexes.
///
/// The stored `(hex, direction)` is whatever spelling the caller used; comparisons
/// and hashing go through [`VertexCoord::canonical`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VertexCoord {
    /// The hex this vertex is described from
    pub hex: HexCoord,
    /// Which corner of that hex
    #[serde(rename = "dir")]
    pub direction: VertexDirection,
}

impl VertexCoord {
    /// Create a vertex coordinate as spelled (no canonicalization)
    pub const fn new(hex: HexCoord, direction: VertexDirection) -> Self {
        Self { hex, direction }
    }

    /// Build from a raw wire triple, rejecting out-of-range directions
    pub fn from_parts(q: i32, r: i32, dir: u8) -> Option<Self> {
        VertexDirection::from_index(dir).map(|d| Self::new(HexCoord::new(q, r), d))
    }

    /// The `(q, r, dir)` triple exactly as spelled
    pub fn raw(&self) -> (i32, i32, u8) {
        (self.hex.q, self.hex.r, self.direction.index())
    }

    /// All three spellings of this corner.
    ///
    /// Corner `d` of hex `h` is corner `d+4` of the hex across side `d`, and
    /// corner `d+2` of the hex across side `d-1`.
    pub fn equivalents(&self) -> [VertexCoord; 3] {
        let d = self.direction;
        [
            *self,
            VertexCoord::new(self.hex.neighbor(d.side_after()), d.rotate(4)),
            VertexCoord::new(self.hex.neighbor(d.side_before()), d.rotate(2)),
        ]
    }

    /// The smallest spelling by `(q, r, dir)`
    pub fn canonical(&self) -> VertexCoord {
        let mut best = *self;
        for candidate in self.equivalents() {
            if candidate.raw() < best.raw() {
                best = candidate;
            }
        }
        best
    }

    /// Whether `other` is one of this corner's spellings
    pub fn same_feature(&self, other: &VertexCoord) -> bool {
        self.equivalents().iter().any(|v| v.raw() == other.raw())
    }

    /// The three hex positions meeting at this corner (some may be off-board)
    pub fn touching_hexes(&self) -> [HexCoord; 3] {
        self.equivalents().map(|v| v.hex)
    }

    /// Get the 3 edges that meet at this vertex
    pub fn touching_edges(&self) -> [EdgeCoord; 3] {
        let d = self.direction;
        let across = self.hex.neighbor(d.side_after());
        [
            EdgeCoord::new(self.hex, d.side_before()),
            EdgeCoord::new(self.hex, d.side_after()),
            EdgeCoord::new(across, d.side_after().rotate(4)),
        ]
    }

    /// Get the 3 adjacent vertices (for distance rule checking)
    ///
    /// Two lie on this hex, the third is reached through the neighbour across
    /// the side that starts here.
    pub fn adjacent_vertices(&self) -> [VertexCoord; 3] {
        let d = self.direction;
        let across = self.hex.neighbor(d.side_after());
        [
            VertexCoord::new(self.hex, d.rotate(5)),
            VertexCoord::new(self.hex, d.rotate(1)),
            VertexCoord::new(across, d.rotate(5)),
        ]
    }

    /// Convert to pixel coordinates
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let (cx, cy) = self.hex.to_pixel(hex_size);
        let angle = self.direction.angle_degrees().to_radians();
        (cx + hex_size * angle.cos(), cy + hex_size * angle.sin())
    }

    /// Whether `other` is a different corner exactly one side length away.
    ///
    /// Computed from the pixel projection alone, independent of the index
    /// arithmetic in [`VertexCoord::adjacent_vertices`].
    pub fn is_geometrically_adjacent(&self, other: &VertexCoord) -> bool {
        if self.same_feature(other) {
            return false;
        }
        let (x1, y1) = self.to_pixel(UNIT_HEX_SIZE);
        let (x2, y2) = other.to_pixel(UNIT_HEX_SIZE);
        let distance = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        (distance - UNIT_HEX_SIZE).abs() < GEOMETRY_EPSILON
    }

    fn key(&self) -> (i32, i32, u8) {
        self.canonical().raw()
    }
}

impl PartialEq for VertexCoord {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VertexCoord {}

impl Hash for VertexCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for VertexCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for VertexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.hex, self.direction.index())
    }
}

/// Edge coordinate - identifies a side of a hex where roads are built.
///
/// Each edge is shared by exactly 2 hexes. Like [`VertexCoord`], equality is
/// decided on the canonical spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeCoord {
    /// The hex this edge is described from
    pub hex: HexCoord,
    /// Which side of that hex
    #[serde(rename = "dir")]
    pub direction: EdgeDirection,
}

impl EdgeCoord {
    /// Create an edge coordinate as spelled (no canonicalization)
    pub const fn new(hex: HexCoord, direction: EdgeDirection) -> Self {
        Self { hex, direction }
    }

    /// Build from a raw wire triple, rejecting out-of-range directions
    pub fn from_parts(q: i32, r: i32, dir: u8) -> Option<Self> {
        EdgeDirection::from_index(dir).map(|d| Self::new(HexCoord::new(q, r), d))
    }

    /// The `(q, r, dir)` triple exactly as spelled
    pub fn raw(&self) -> (i32, i32, u8) {
        (self.hex.q, self.hex.r, self.direction.index())
    }

    /// Both spellings of this side
    pub fn equivalents(&self) -> [EdgeCoord; 2] {
        [
            *self,
            EdgeCoord::new(self.hex.neighbor(self.direction), self.direction.opposite()),
        ]
    }

    /// The smaller spelling by `(q, r, dir)`
    pub fn canonical(&self) -> EdgeCoord {
        let [a, b] = self.equivalents();
        if a.raw() <= b.raw() {
            a
        } else {
            b
        }
    }

    /// Whether `other` is one of this side's spellings
    pub fn same_feature(&self, other: &EdgeCoord) -> bool {
        self.equivalents().iter().any(|e| e.raw() == other.raw())
    }

    /// Get the 2 hexes that share this edge
    pub fn touching_hexes(&self) -> [HexCoord; 2] {
        self.equivalents().map(|e| e.hex)
    }

    /// Get the 2 vertices at the endpoints of this edge
    pub fn endpoints(&self) -> [VertexCoord; 2] {
        self.direction.corners().map(|c| VertexCoord::new(self.hex, c))
    }

    /// Whether this edge ends at `vertex` (under any spelling)
    pub fn touches(&self, vertex: &VertexCoord) -> bool {
        self.endpoints().contains(vertex)
    }

    /// Get edges that share a vertex with this edge (for road connectivity)
    pub fn adjacent_edges(&self) -> Vec<EdgeCoord> {
        let mut adjacent: Vec<EdgeCoord> = Vec::with_capacity(4);
        for vertex in self.endpoints() {
            for edge in vertex.touching_edges() {
                if edge != *self && !adjacent.contains(&edge) {
                    adjacent.push(edge);
                }
            }
        }
        adjacent
    }

    /// Convert to pixel coordinates (midpoint of edge)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let [v1, v2] = self.endpoints();
        let (x1, y1) = v1.to_pixel(hex_size);
        let (x2, y2) = v2.to_pixel(hex_size);
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    fn key(&self) -> (i32, i32, u8) {
        self.canonical().raw()
    }
}

impl PartialEq for EdgeCoord {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for EdgeCoord {}

impl Hash for EdgeCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for EdgeCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for EdgeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.hex, self.direction.index())
    }
}
