//! Per-game configuration chosen when a room is created.

use serde::{Deserialize, Serialize};

/// Board size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardSize {
    /// 19 hexes, up to 4 players
    #[default]
    Standard,
    /// 30 hexes, up to 6 players
    Extended,
}

impl BoardSize {
    pub fn max_players(self) -> usize {
        match self {
            BoardSize::Standard => 4,
            BoardSize::Extended => 6,
        }
    }
}

/// Rules knobs for a single game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub board_size: BoardSize,
    /// Let other players build after each turn (extended board, 5+ players)
    pub special_build_phase: bool,
    pub victory_points_to_win: u32,
}

impl GameConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn extended() -> Self {
        Self {
            board_size: BoardSize::Extended,
            special_build_phase: true,
            ..Self::default()
        }
    }

    pub fn max_players(&self) -> usize {
        self.board_size.max_players()
    }

    /// Whether ending a turn should open the special building rotation
    pub fn uses_special_build(&self, player_count: usize) -> bool {
        self.board_size == BoardSize::Extended && self.special_build_phase && player_count > 4
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: BoardSize::Standard,
            special_build_phase: false,
            victory_points_to_win: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"board_size":"extended"}"#).unwrap();
        assert_eq!(config.board_size, BoardSize::Extended);
        assert_eq!(config.victory_points_to_win, 10);
        assert!(!config.special_build_phase);
        assert_eq!(config.max_players(), 6);
    }

    #[test]
    fn test_special_build_needs_five_players() {
        let config = GameConfig::extended();
        assert!(!config.uses_special_build(4));
        assert!(config.uses_special_build(5));
        assert!(!GameConfig::standard().uses_special_build(5));
    }
}
