use crate::error::GameError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "set-arena.toml";

/// Prefix for environment overrides, e.g. `SET_ARENA__TIMING__ROUND_MS=30000`
pub const ENV_PREFIX: &str = "SET_ARENA";

/// Main configuration structure for a game
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board and deck dimensions
    pub table: TableConfig,
    /// Round, freeze and polling durations
    pub timing: TimingConfig,
    /// Participants
    pub players: PlayersConfig,
    /// Seed for the coordinator's random source (random when absent)
    pub seed: Option<u64>,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of board slots
    pub slots: usize,
    /// Cards per qualifying group
    pub group_size: usize,
    /// Total number of distinct cards
    pub deck_size: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Round length before a forced reshuffle
    pub round_ms: u64,
    /// Remaining time below which the countdown is in warning mode
    pub warning_ms: u64,
    /// Coordinator wait slice outside the warning window
    pub countdown_tick_ms: u64,
    /// Coordinator wait slice inside the warning window
    pub warning_tick_ms: u64,
    /// Freeze after a reward
    pub point_freeze_ms: u64,
    /// Freeze after a penalty
    pub penalty_freeze_ms: u64,
    /// Freeze display refresh slice
    pub freeze_tick_ms: u64,
    /// Pause of an autonomous generator after its agent submits a claim
    pub autonomous_grace_ms: u64,
    /// Delay between two synthetic inputs
    pub autonomous_input_interval_ms: u64,
    /// How long shutdown waits for a task before aborting it
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayersConfig {
    /// Agents driven by an external input source
    pub human: usize,
    /// Agents driven by a random input generator
    pub autonomous: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log directive when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            slots: 12,
            group_size: 3,
            deck_size: 81,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            round_ms: 60_000,
            warning_ms: 5_000,
            countdown_tick_ms: 100,
            warning_tick_ms: 10,
            point_freeze_ms: 1_000,
            penalty_freeze_ms: 3_000,
            freeze_tick_ms: 100,
            autonomous_grace_ms: 200,
            autonomous_input_interval_ms: 10,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            human: 2,
            autonomous: 0,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            table: TableConfig::default(),
            timing: TimingConfig::default(),
            players: PlayersConfig::default(),
            seed: None,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl TimingConfig {
    pub fn round(&self) -> Duration {
        Duration::from_millis(self.round_ms)
    }

    pub fn warning(&self) -> Duration {
        Duration::from_millis(self.warning_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn warning_tick(&self) -> Duration {
        Duration::from_millis(self.warning_tick_ms)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_ms)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_ms)
    }

    pub fn freeze_tick(&self) -> Duration {
        Duration::from_millis(self.freeze_tick_ms)
    }

    pub fn autonomous_grace(&self) -> Duration {
        Duration::from_millis(self.autonomous_grace_ms)
    }

    pub fn autonomous_input_interval(&self) -> Duration {
        Duration::from_millis(self.autonomous_input_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl PlayersConfig {
    pub fn total(&self) -> usize {
        self.human + self.autonomous
    }
}

impl GameConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`set-arena.toml` unless a path is given)
    /// 3. Environment variables (prefixed with SET_ARENA__)
    pub fn load(path: Option<&Path>) -> Result<Self, GameError> {
        let mut builder = Config::builder().add_source(Config::try_from(&GameConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: GameConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject dimensions the engine cannot run with
    pub fn validate(&self) -> Result<(), GameError> {
        if self.table.group_size == 0 {
            return Err(GameError::invalid_config("group_size must be at least 1"));
        }
        if self.table.slots < self.table.group_size {
            return Err(GameError::invalid_config(format!(
                "{} slots cannot hold a group of {}",
                self.table.slots, self.table.group_size
            )));
        }
        if self.players.total() == 0 {
            return Err(GameError::invalid_config("at least one player is required"));
        }
        if self.timing.round_ms == 0 {
            return Err(GameError::invalid_config("round_ms must be positive"));
        }
        if self.timing.countdown_tick_ms == 0 || self.timing.warning_tick_ms == 0 {
            return Err(GameError::invalid_config("countdown ticks must be positive"));
        }
        if self.timing.freeze_tick_ms == 0 {
            return Err(GameError::invalid_config("freeze_tick_ms must be positive"));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GameError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, GameError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<(), GameError> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().map_err(|e| GameError::invalid_config(format!(".env: {e}")))?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.table.group_size, 3);
        assert_eq!(config.timing.round(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_small_board() {
        let mut config = GameConfig::default();
        config.table.slots = 2;
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_no_players() {
        let mut config = GameConfig::default();
        config.players.human = 0;
        config.players.autonomous = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let mut config = GameConfig::default();
        config.seed = Some(11);
        config.players.autonomous = 3;

        let text = config.to_toml().unwrap();
        let parsed: GameConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
