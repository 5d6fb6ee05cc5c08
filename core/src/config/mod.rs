//! Match configuration (`match.toml`)
//!
//! Describes who plays, under which rules, and with what seed. A config is
//! validated once before a match starts and is immutable afterwards.

mod stage;

pub use stage::{Bounds2D, Ground, NamedPoint, PointKind, StageLayout, StageSettings};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fixed cap on participants. Input blocks and replay records are always this wide.
pub const MAX_PLAYERS: usize = 8;

/// Which family of rules a match runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Time limit and/or stock count, selected by the config values
    #[default]
    Default,
    /// No elimination; dead players always respawn
    Training,
}

/// A player's character pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CharacterSelection {
    #[serde(default)]
    pub character_id: u32,
    #[serde(default)]
    pub palette: u8,
}

/// Per-participant configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Slot in the input block (0..MAX_PLAYERS)
    pub player_id: u8,
    /// Local device index, or `None` for a remote participant
    #[serde(default)]
    pub local_id: Option<u8>,
    #[serde(default)]
    pub selection: CharacterSelection,
    /// Damage the player starts (and respawns) with
    #[serde(default)]
    pub default_damage: f32,
}

impl PlayerConfig {
    pub fn local(player_id: u8) -> Self {
        Self {
            player_id,
            local_id: Some(player_id),
            selection: CharacterSelection::default(),
            default_damage: 0.0,
        }
    }

    pub fn remote(player_id: u8) -> Self {
        Self {
            local_id: None,
            ..Self::local(player_id)
        }
    }

    pub fn is_local(&self) -> bool {
        self.local_id.is_some()
    }
}

/// Full match configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub stage_id: u32,
    #[serde(default)]
    pub mode: MatchMode,
    /// Stocks per player; zero disables the stock rule
    #[serde(default = "default_stocks")]
    pub stocks: u32,
    /// Time limit in ticks; zero disables the time rule
    #[serde(default = "default_time")]
    pub time: u32,
    /// Seed for the match RNG and every player's RNG
    #[serde(default)]
    pub seed: u64,
    /// Countdown ticks before gameplay starts
    #[serde(default)]
    pub intro_ticks: u32,
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
}

fn default_stocks() -> u32 {
    3
}

fn default_time() -> u32 {
    // 8 minutes at 60 ticks per second
    8 * 60 * 60
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::local(2)
    }
}

impl MatchConfig {
    /// All-local match for `player_count` players with default rules.
    pub fn local(player_count: usize) -> Self {
        Self {
            stage_id: 0,
            mode: MatchMode::Default,
            stocks: default_stocks(),
            time: default_time(),
            seed: 0,
            intro_ticks: 0,
            players: (0..player_count.min(MAX_PLAYERS))
                .map(|id| PlayerConfig::local(id as u8))
                .collect(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// True when every participant is driven by a local device.
    pub fn is_local(&self) -> bool {
        self.players.iter().all(PlayerConfig::is_local)
    }

    /// Check the invariants a match relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.players.len();
        if count == 0 || count > MAX_PLAYERS {
            return Err(ConfigError::InvalidPlayerCount(count));
        }
        if self.stocks > i8::MAX as u32 {
            return Err(ConfigError::TooManyStocks(self.stocks));
        }
        let mut seen = HashSet::with_capacity(count);
        for player in &self.players {
            if player.player_id as usize >= MAX_PLAYERS {
                return Err(ConfigError::PlayerIdOutOfRange(player.player_id));
            }
            if !seen.insert(player.player_id) {
                return Err(ConfigError::DuplicatePlayerId(player.player_id));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Errors raised while loading or validating match and stage configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid player count {0} (expected 1..={MAX_PLAYERS})")]
    InvalidPlayerCount(usize),
    #[error("player id {0} out of range (expected < {MAX_PLAYERS})")]
    PlayerIdOutOfRange(u8),
    #[error("player id {0} configured more than once")]
    DuplicatePlayerId(u8),
    #[error("{0} stocks exceeds the supported maximum of {max}", max = i8::MAX)]
    TooManyStocks(u32),
    #[error("duplicate {kind} point name '{name}'")]
    DuplicatePointName { kind: PointKind, name: String },
    #[error("stage has no spawn points")]
    NoSpawnPoints,
    #[error("stage has no respawn points")]
    NoRespawnPoints,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_config_is_valid() {
        let config = MatchConfig::local(4);
        assert_eq!(config.player_count(), 4);
        assert!(config.is_local());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_player_count_bounds() {
        let mut config = MatchConfig::local(1);
        config.players.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPlayerCount(0))
        ));

        let mut config = MatchConfig::local(MAX_PLAYERS);
        config.players.push(PlayerConfig::local(0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPlayerCount(9))
        ));
    }

    #[test]
    fn test_player_id_checks() {
        let mut config = MatchConfig::local(2);
        config.players[1].player_id = 8;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PlayerIdOutOfRange(8))
        ));

        config.players[1].player_id = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePlayerId(0))
        ));
    }

    #[test]
    fn test_remote_player_makes_match_non_local() {
        let mut config = MatchConfig::local(2);
        config.players[1] = PlayerConfig::remote(1);
        assert!(!config.is_local());
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = MatchConfig::from_toml_str(
            r#"
            stocks = 0
            time = 3600
            seed = 42

            [[players]]
            player_id = 0
            local_id = 0

            [[players]]
            player_id = 1
            default_damage = 10.0
            selection = { character_id = 3, palette = 1 }
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, MatchMode::Default);
        assert_eq!(config.stocks, 0);
        assert_eq!(config.time, 3600);
        assert_eq!(config.seed, 42);
        assert_eq!(config.intro_ticks, 0);
        assert_eq!(config.players[0].local_id, Some(0));
        assert_eq!(config.players[1].local_id, None);
        assert_eq!(config.players[1].selection.character_id, 3);
        assert_eq!(config.players[1].default_damage, 10.0);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let err = MatchConfig::from_toml_str("stocks = 200\n[[players]]\nplayer_id = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TooManyStocks(200)));

        let err = MatchConfig::from_toml_str("stocks = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_reports_path() {
        let err = MatchConfig::load("/nonexistent/match.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/match.toml"));
    }
}
